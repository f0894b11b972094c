pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::toml_config::AggregatorConfig;
pub use core::aggregator::{SearchAggregator, StreamSummary};
pub use core::emitter::{ChannelSink, FrameWriter, STREAM_HEADERS};
pub use domain::model::{Credentials, ProviderKind, ProviderOutcome, SearchQuery, StreamEvent};
pub use domain::ports::EventSink;
pub use utils::error::{AggregatorError, Result};
