pub mod analysis;
pub mod collect;
pub mod commons;
pub mod config;
pub mod error;
pub mod geo_core;
pub mod geometric;
pub mod report;

pub use analysis::pipeline::{AnalysisReport, AnalysisRequest, Pipeline, RunOptions, RunOutcome};
pub use error::{AnalysisError, DatasetError, ImageryError};
pub use geometric::road::{Segment, SegmentTable};
