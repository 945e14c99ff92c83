pub mod engine;
pub mod meters;
pub mod wav;
