pub mod analyzer;
pub mod morphology;

pub use analyzer::{LayoutAnalyzer, LayoutConfig};
