pub mod app;
pub mod config;
pub mod error;
pub mod live;
pub mod pause;
pub mod supervisor;
pub mod sync;
pub mod telemetry;

pub use app::App;
pub use config::{Config, ConfigError, RawConfig};
pub use error::CollectorError;
pub use live::LiveHandler;
pub use pause::PauseGate;
pub use supervisor::Supervisor;
pub use sync::{RepositorySyncReport, SyncJob, SyncOptions, SyncReport};
