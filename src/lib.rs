pub mod attributes;
pub mod config;
pub mod constants;
pub mod error;
pub mod estimate;
pub mod executor;
pub mod filter;
pub mod folder;
pub mod labels;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod preview;
pub mod progress;
pub mod thumbnail;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use attributes::AttributeStore;
pub use error::TaggerError;
pub use llm::TaggingBackend;
pub use pipeline::{RunOutcome, TaggingRun};
pub use progress::ProgressSink;
pub use thumbnail::ThumbnailProvider;
