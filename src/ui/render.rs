use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

use super::app::App;

/// Lowest level shown on the meters
const METER_FLOOR_DB: f32 = -60.0;

/// Render the TUI
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(3),    // Channel meters
            Constraint::Length(3), // Status
            Constraint::Length(4), // Help
        ])
        .split(frame.size());

    render_title(frame, chunks[0], app);
    render_channels(frame, chunks[1], app);
    render_status(frame, chunks[2], app);
    render_help(frame, chunks[3]);
}

/// Render title bar
fn render_title(frame: &mut Frame, area: Rect, app: &App) {
    let text = format!(
        "The Noise - Pink Noise  |  {}  |  {} Hz",
        app.device_name, app.sample_rate
    );
    let title = Paragraph::new(text)
        .style(Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(title, area);
}

/// Render one meter line per channel
fn render_channels(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title("Channels").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut constraints = vec![Constraint::Length(1); app.channels.len()];
    constraints.push(Constraint::Min(0));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    for (idx, (channel, row)) in app.channels.iter().zip(rows.iter()).enumerate() {
        let db = level_to_db(app.level(idx));
        let selected = idx == app.selected;

        let color = if selected { Color::Yellow } else { Color::Magenta };
        let style = if selected {
            Style::default().fg(color).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(color)
        };

        let prefix = if selected { "► " } else { "  " };
        let label = format!(
            "{}{} (out {}, {:?}) rows: {:2}  {:6.1} dBFS",
            prefix, channel.name, channel.audioch, channel.source, channel.rows, db
        );

        let gauge = Gauge::default()
            .gauge_style(style)
            .label(label)
            .ratio(db_to_ratio(db) as f64);

        frame.render_widget(gauge, *row);
    }
}

/// Render last status message
fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let text = app.status.as_deref().unwrap_or("Streaming");
    let paragraph = Paragraph::new(text)
        .block(Block::default().title("Status").borders(Borders::ALL))
        .style(Style::default().fg(Color::White));

    frame.render_widget(paragraph, area);
}

/// Render help text
fn render_help(frame: &mut Frame, area: Rect) {
    let help_text = vec![
        Line::from("Controls:"),
        Line::from("  ↑/↓ or k/j: Select channel  |  ←/→ or h/l or -/+: Rows  |  Q/Esc: Quit"),
    ];

    let paragraph = Paragraph::new(help_text)
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(Color::Gray));

    frame.render_widget(paragraph, area);
}

/// RMS level to dBFS, floored at the meter range
fn level_to_db(level: f32) -> f32 {
    if level > 0.0 {
        (20.0 * level.log10()).max(METER_FLOOR_DB)
    } else {
        METER_FLOOR_DB
    }
}

/// Position of a dBFS value on the meter
fn db_to_ratio(db: f32) -> f32 {
    ((db - METER_FLOOR_DB) / -METER_FLOOR_DB).clamp(0.0, 1.0)
}
