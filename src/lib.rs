//! Referendum results by region: loads ballot counts per department, resolves
//! departments to regions, sums the counts per region and draws a choropleth
//! of the share of "Choice A" among expressed ballots.

pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod merge;
pub mod pipeline;
pub mod processing;
pub mod render;
pub mod table;
pub mod types;

pub use error::{PipelineError, Result};
pub use pipeline::{run, PipelineOutput};
