//! Exportline Core - shared infrastructure for the export ingestion pipeline
//!
//! Logging, progress reporting, the shared HTTP runtime, retry policy,
//! graceful shutdown and the Parquet table sink used by the sync engine
//! and the dataset builder.

pub mod accumulator;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod shutdown;
pub mod sink;
pub mod stream;

// Re-exports for convenience
pub use accumulator::{Accumulator, DEFAULT_BATCH_SIZE};
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use retry::{Retryable, retry_with_backoff};
pub use shutdown::{install_signal_handlers, is_shutdown_requested};
pub use sink::{ParquetSink, cleanup_tmp_files};
pub use stream::{HttpConfig, StreamError, download_to_file, get_text, http_config, set_http_config};
