//! Port contracts for run collaborators.

mod expander;
mod pipeline;
mod resource;
mod results;

#[cfg(test)]
pub use expander::MockKeywordExpander;
pub use expander::{ExpanderError, KeywordExpander};
#[cfg(test)]
pub use pipeline::MockReportPipeline;
pub use pipeline::{PipelineContext, PipelineError, PipelineReport, ReportPipeline};
pub use resource::{ResourceError, SharedResource};
pub use results::{ResultSource, ResultSourceError};
