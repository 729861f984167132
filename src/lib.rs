pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod format;
pub mod manifest;
pub mod notifier;
pub mod progress;
pub mod selection;
pub mod session;
pub mod storage;
pub mod transport;

pub use catalog::{Asset, AssetRef, Catalog, Category, Listing, Scope};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use executor::{Action, ActionExecutor, ItemOutcome, Plan, Report};
pub use progress::{ProgressReporter, SilentReporter};
pub use session::Session;
pub use storage::{PresenceMap, PresenceStatus, StorageLocator, StorageMode, StorageRoot};
