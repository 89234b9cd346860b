pub mod config;
pub mod error;
pub mod index;
pub mod logging;
pub mod runtime;
pub mod snapshot;
pub mod storage;

pub use config::IndexConfig;
pub use error::{Result, SiftError};
pub use index::{IndexStats, IndexView, Page, SearchIndex, SearchResult};
pub use runtime::SnapshotTask;
pub use snapshot::{Codec, SyncWrite};
