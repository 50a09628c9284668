pub mod monitor;
pub mod pipeline;

pub use monitor::{MonitorConfig, SpectralMonitor};
pub use pipeline::{Pipeline, RenderStatus, RoundReport};
