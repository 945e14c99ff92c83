mod audio;
mod config;
mod dsp;
mod types;
mod ui;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, path::PathBuf, time::Duration};

use audio::engine::NoiseEngine;
use config::NoiseConfig;
use dsp::pink::{PinkNoise, DEFAULT_ROWS};
use dsp::spectrum;
use dsp::white::RandSource;
use types::events::GeneratorSwap;
use ui::{app::App, events, render};

/// Pending generator swaps the audio thread can hold per channel
const HANDOFF_DEPTH: usize = 2;

/// Frames rendered per engine call; larger callbacks are split into blocks
const CALLBACK_FRAMES: usize = 512;

/// Real-time pink noise generator
#[derive(Parser, Debug)]
#[command(name = "the-noise")]
#[command(about = "Multi-channel pink noise generator", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream pink noise to an audio device with a live monitor
    Play {
        /// Configuration file (YAML)
        #[arg(short = 'c', long = "config")]
        config: PathBuf,
    },

    /// Render pink noise to a WAV file
    Render {
        /// Configuration file (YAML)
        #[arg(short = 'c', long = "config")]
        config: PathBuf,

        /// Output WAV file
        #[arg(short = 'o', long = "output")]
        output: PathBuf,

        /// Length in seconds
        #[arg(short = 's', long = "seconds", default_value_t = 10.0)]
        seconds: f32,

        /// Sample rate in Hz
        #[arg(short = 'r', long = "sample-rate", default_value_t = 48_000)]
        sample_rate: u32,
    },

    /// Print the octave-band spectrum of a generated run
    Analyze {
        /// Number of generator rows
        #[arg(short = 'n', long = "rows", default_value_t = DEFAULT_ROWS)]
        rows: usize,

        /// Number of samples to generate
        #[arg(short = 'm', long = "samples", default_value_t = 1 << 18)]
        samples: usize,

        /// FFT window length
        #[arg(short = 'w', long = "window", default_value_t = 4096)]
        window: usize,

        /// Sample rate used to label band frequencies
        #[arg(short = 'r', long = "sample-rate", default_value_t = 48_000)]
        sample_rate: u32,

        /// Seed for a reproducible run
        #[arg(long = "seed")]
        seed: Option<u64>,
    },

    /// List available audio output devices and exit
    List,
}

/// List available audio output devices
fn list_audio_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();

    // Collect all devices from iterator
    let mut devices: Vec<String> = host
        .output_devices()?
        .filter_map(|device| {
            device.description()
                .ok()
                .map(|desc| desc.name().to_string())
        })
        .collect();

    // Also try to get the default device explicitly
    if let Some(default_device) = host.default_output_device() {
        if let Ok(default_desc) = default_device.description() {
            let default_name = default_desc.name().to_string();
            // Add default device if not already in list
            if !devices.contains(&default_name) {
                devices.push(default_name);
            }
        }
    }

    if devices.is_empty() {
        return Err(anyhow!("No audio output devices found"));
    }

    Ok(devices)
}

/// Find an audio device name by name or index string
fn find_audio_device(devices: &[String], search: &str) -> Result<String> {
    // Try to parse as index first
    if let Ok(index) = search.parse::<usize>() {
        if index < devices.len() {
            return Ok(devices[index].clone());
        } else {
            return Err(anyhow!("Audio device index {} out of range (0-{})", index, devices.len() - 1));
        }
    }

    // Search by name (case-insensitive substring match)
    let search_lower = search.to_lowercase();
    devices
        .iter()
        .find(|device| device.to_lowercase().contains(&search_lower))
        .cloned()
        .ok_or_else(|| anyhow!("Audio device '{}' not found", search))
}

/// Open the output device listed under `name`, including the host default
fn open_output_device(host: &cpal::Host, name: &str) -> Result<cpal::Device> {
    host.output_devices()?
        .chain(host.default_output_device())
        .find(|device| {
            device
                .description()
                .is_ok_and(|desc| desc.name() == name)
        })
        .ok_or_else(|| anyhow!("Selected audio device '{}' not available", name))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Parse command line arguments
    let args = Args::parse();

    match args.command {
        Command::Play { config } => run_play(config),
        Command::Render {
            config,
            output,
            seconds,
            sample_rate,
        } => run_render(config, output, seconds, sample_rate),
        Command::Analyze {
            rows,
            samples,
            window,
            sample_rate,
            seed,
        } => run_analyze(rows, samples, window, sample_rate, seed),
        Command::List => {
            println!("Available Audio Output Devices:");
            for (i, device) in list_audio_devices()?.iter().enumerate() {
                println!("  {}: {}", i, device);
            }
            Ok(())
        }
    }
}

/// Stream the configured channels to the selected output device
fn run_play(config_path: PathBuf) -> Result<()> {
    // Load configuration
    let config = NoiseConfig::load(&config_path)?;
    log::info!("Loaded {} channel(s) from {}", config.channels.len(), config_path.display());

    // Find device
    let host = cpal::default_host();
    let device = if config.devices.wants_default_output() {
        host.default_output_device()
            .ok_or_else(|| anyhow!("No default audio output device"))?
    } else {
        let audio_devices = list_audio_devices()?;
        let selected = find_audio_device(&audio_devices, &config.devices.audioout)?;
        open_output_device(&host, &selected)?
    };
    let device_name = device
        .description()
        .map(|desc| desc.name().to_string())
        .unwrap_or_else(|_| "unknown device".to_string());

    let audio_config = device.default_output_config()?;
    let num_channels = audio_config.channels() as usize;
    let sample_rate = audio_config.sample_rate();
    if num_channels == 0 {
        return Err(anyhow!("Device '{}' reports no output channels", device_name));
    }

    // Generators are built here, before the audio thread exists
    let engine = NoiseEngine::new(config.build_channels()?);
    if engine.required_output_channels() > num_channels {
        log::warn!(
            "Device '{}' has {} output channel(s); channels routed beyond that stay silent",
            device_name,
            num_channels
        );
    }

    // Generator handoff channels, bounded so the audio thread never allocates
    let depth = HANDOFF_DEPTH * config.channels.len();
    let (swap_tx, swap_rx) = crossbeam_channel::bounded::<GeneratorSwap>(depth);
    let (retired_tx, retired_rx) = crossbeam_channel::bounded::<GeneratorSwap>(depth);
    let engine = engine.with_handoff(swap_rx, retired_tx);
    let meters = engine.meters();

    // Start audio stream
    let _stream = match audio_config.sample_format() {
        cpal::SampleFormat::F32 => {
            start_audio_stream::<f32>(&device, &audio_config.into(), engine, num_channels)?
        }
        cpal::SampleFormat::I16 => {
            start_audio_stream::<i16>(&device, &audio_config.into(), engine, num_channels)?
        }
        cpal::SampleFormat::U16 => {
            start_audio_stream::<u16>(&device, &audio_config.into(), engine, num_channels)?
        }
        other => return Err(anyhow!("Unsupported sample format: {:?}", other)),
    };
    log::info!("Streaming to '{}' ({} channels, {} Hz)", device_name, num_channels, sample_rate);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(&config.channels, device_name, sample_rate, meters, swap_tx, retired_rx);

    // Run UI loop
    let result = run_ui_loop(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Start audio stream driving the noise engine
fn start_audio_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut engine: NoiseEngine,
    num_channels: usize,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>,
{
    // Pre-allocate buffer for processing
    let mut scratch = vec![0.0f32; CALLBACK_FRAMES * num_channels];

    // Build output stream
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            fill_output(&mut engine, &mut scratch, data, num_channels);
        },
        |err| log::error!("Audio stream error: {}", err),
        None,
    )?;

    stream.play()?;

    Ok(stream)
}

/// Render `data` through the engine one scratch-sized block at a time
/// Called from the audio callback: never grows `scratch`
fn fill_output<T>(engine: &mut NoiseEngine, scratch: &mut [f32], data: &mut [T], num_channels: usize)
where
    T: cpal::Sample + cpal::FromSample<f32>,
{
    let block_len = scratch.len() - scratch.len() % num_channels.max(1);
    if num_channels == 0 || block_len == 0 {
        data.fill(T::EQUILIBRIUM);
        return;
    }

    for chunk in data.chunks_mut(block_len) {
        let samples = chunk.len() - chunk.len() % num_channels;
        let block = &mut scratch[..samples];
        engine.process(block, num_channels);

        // Convert to output sample format
        for (out, sample) in chunk.iter_mut().zip(block.iter()) {
            *out = T::from_sample(*sample);
        }
    }
}

/// Run the monitor until the user quits
fn run_ui_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Reclaim generators swapped out by the audio thread
        app.collect_retired();

        // Render UI
        terminal.draw(|f| render::render(f, app))?;

        // Handle events
        events::handle_events(app)?;

        // Check if should quit
        if app.should_quit {
            break;
        }

        // Small sleep to reduce CPU usage
        std::thread::sleep(Duration::from_millis(16)); // ~60 FPS
    }

    Ok(())
}

/// Render the configured channels offline
fn run_render(config_path: PathBuf, output: PathBuf, seconds: f32, sample_rate: u32) -> Result<()> {
    let config = NoiseConfig::load(&config_path)?;
    let mut engine = NoiseEngine::new(config.build_channels()?);

    let frames = audio::wav::render_wav(&mut engine, &output, sample_rate, seconds)?;
    log::info!("Rendered {} frames to {}", frames, output.display());
    println!(
        "Wrote {} ({} channel(s), {} frames at {} Hz)",
        output.display(),
        engine.required_output_channels(),
        frames,
        sample_rate
    );

    Ok(())
}

/// Generate a run and print its octave-band spectrum
fn run_analyze(
    rows: usize,
    samples: usize,
    window: usize,
    sample_rate: u32,
    seed: Option<u64>,
) -> Result<()> {
    let source = match seed {
        Some(seed) => RandSource::from_seed(seed),
        None => RandSource::from_entropy(),
    };
    let mut pink = PinkNoise::new(rows, source)?;

    let mut buffer = vec![0.0f32; samples];
    pink.fill(&mut buffer);

    let psd = spectrum::welch_psd(&buffer, window)?;
    let bands = spectrum::octave_bands(&psd, sample_rate as f32);

    println!("Pink noise, {} rows, {} samples, window {}", pink.row_count(), samples, window);
    println!("{:>12}  {:>12}  {:>10}", "bins", "center Hz", "power dB");
    for band in &bands {
        let bins = format!("{}-{}", band.low_bin, band.high_bin);
        println!("{:>12}  {:>12.1}  {:>10.2}", bins, band.center_hz, band.power_db);
    }

    // The top octave is flattened by the per-sample white term
    let fitted = bands.len().saturating_sub(1);
    match spectrum::slope_db_per_octave(&bands[..fitted]) {
        Some(slope) => println!("Slope: {:.2} dB/octave (pink = -3.01)", slope),
        None => println!("Not enough octave bands to fit a slope"),
    }

    Ok(())
}
