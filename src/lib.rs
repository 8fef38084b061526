pub mod binding;
pub mod error_codes;
pub mod errors;
pub mod hierarchy;
pub mod lifecycle;
pub mod models;
pub mod page;
pub mod retry;
pub mod scheduler;
pub mod settings;
pub mod store;
pub mod templates;

pub use crate::errors::{AppResult, ErrorClass, HResult, JournalError};
pub use crate::hierarchy::{HierarchyResolver, ResolvedPath};
pub use crate::lifecycle::{JournalHost, JournalService, OpenOutcome};
pub use crate::models::{
    JournalConfig, PageColor, PageSettings, PageTitleFormat, PaperSize, SettingField,
    StorageAccount, TemplateVariant,
};
pub use crate::page::{PageDocument, UpdateStamp};
pub use crate::retry::{RetryError, RetryPolicy};
pub use crate::scheduler::{DocumentLane, MutationJob, MutationScheduler};
pub use crate::settings::{JsonSettingsStore, SettingsModel, SettingsObserver, SettingsStore};
pub use crate::store::{DocumentStoreClient, NotifyUser, ViewController, ViewPosition};
pub use crate::templates::{PageTemplate, TemplateOperation};

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Installs JSON logging into `<data_dir>/logs/journal.log`, rotated daily.
/// `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing(data_dir: &Path) -> AppResult<()> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "journal.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| JournalError::Internal(error.to_string()))
}
