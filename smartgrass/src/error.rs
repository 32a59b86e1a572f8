use thiserror::Error;

/// Errors that stop a single analysis run.
///
/// Empty results (no imagery, no vegetation) are not errors; they are
/// reported through `RunOutcome`.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no toll-road segment found for region '{0}'")]
    NoRegionMatch(String),
    #[error("cannot build an area of interest from an empty segment set")]
    EmptySegmentSet,
    #[error("invalid analysis request: {0}")]
    InvalidRequest(String),
    #[error("reference segment table is not loaded")]
    DatasetNotLoaded,
    #[error("geometry error: {0}")]
    Geometry(String),
    #[error("report generation failed: {0}")]
    Report(String),
}

/// Failures of the remote imagery query service
#[derive(Debug, Error)]
pub enum ImageryError {
    #[error("imagery request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("imagery service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid imagery response: {0}")]
    Decode(String),
    #[error("imagery fixture unavailable: {0}")]
    Fixture(String),
}

/// Failures while loading the toll-road reference dataset
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to download toll-road dataset: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("toll-road dataset source returned {status}: {url}")]
    Status { status: u16, url: String },
    #[error("failed to read toll-road dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse toll-road dataset: {0}")]
    Parse(String),
    #[error("toll-road dataset is missing required field '{0}'")]
    MissingField(&'static str),
}
