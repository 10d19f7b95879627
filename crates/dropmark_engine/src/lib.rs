//! Dropmark engine: API fetch pipeline and concurrent item finalization.
//!
//! Imports must run inside a Tokio runtime; concurrent finalization spawns one
//! task per item on it.
mod fetch;
mod finalize;
mod options;
mod prepare;
mod progress;
mod sinks;
mod traverse;

pub use fetch::import_collection;
pub use finalize::finalize_collection;
pub use options::{Concurrency, DecodePolicy, ImportOptions, DEFAULT_TIMEOUT};
pub use prepare::{RequestPreparer, UserAgent, DEFAULT_USER_AGENT};
pub use progress::{ByteProgress, ItemProgress, LoggingProgress, SilentProgress};
pub use sinks::{ErrorSink, WarningSink};
pub use traverse::{HttpLinkTraverser, LinkTraverser, TraverseSettings, UNSUPPORTED_SCHEME};
