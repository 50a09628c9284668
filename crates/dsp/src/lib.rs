pub mod pulse;
pub mod track;
pub mod window;

pub use pulse::{DetectionProfile, PulseCandidate, PulseDetector};
pub use track::{PulseTracker, TrackedPulse};
pub use window::{AveragedSpectrum, WindowAverager};
