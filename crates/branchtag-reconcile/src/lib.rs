pub mod matcher;
pub mod orchestrator;
pub mod owner;
pub mod report;
pub mod tags;

pub use orchestrator::{Orchestrator, RunOptions, TagValue};
pub use report::{ProjectReport, RunReport, WriteStatus};
