pub mod aggregator;
pub mod dispatcher;
pub mod emitter;

pub use crate::domain::model::{ProviderKind, ProviderOutcome, StreamEvent};
pub use crate::domain::ports::EventSink;
pub use crate::utils::error::Result;
