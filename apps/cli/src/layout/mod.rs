// Page layout: line-height handling and the page-fit search.
// The search is sequential; each iteration blocks on one browser render.

pub mod line_height;
pub mod page_fit;

pub use page_fit::{FitConfig, FitOutcome, FitRun, PageFitOptimizer};
