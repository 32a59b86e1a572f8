pub mod aggregate;
pub mod kpi;
pub mod pipeline;
pub mod prediction;
pub mod priority;
pub mod trend;
