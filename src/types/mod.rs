pub mod chart;
pub mod learning;
pub mod metrics;
pub mod pattern;
pub mod prediction;
pub mod signals;
pub mod tracking;

pub use chart::*;
pub use learning::*;
pub use metrics::*;
pub use pattern::*;
pub use prediction::*;
pub use signals::*;
pub use tracking::*;
