pub mod persistence;
pub mod runner;

pub use crate::domain::model::{
    Discovery, NormalizedBatch, PersistSummary, PublishSummary, RawPayload, ValidationReport,
};
pub use crate::domain::ports::{SourceAdapter, Storage};
pub use crate::utils::error::Result;
