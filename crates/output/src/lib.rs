pub mod surface;
pub mod waterfall;

pub use surface::{DisplayMarks, PlotSurface};
pub use waterfall::{PlotRing, PlotRow};
