//! HTTP transport for object downloads and listings.
//!
//! Uses async reqwest on a shared tokio runtime with per-chunk read timeouts,
//! but presents a sync interface so rayon workers can call it directly.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{LazyLock, OnceLock};
use std::time::Duration;

/// Transport tuning, set once at startup from config/CLI
#[derive(Debug, Clone, Copy)]
pub struct HttpConfig {
    /// No data for this long while streaming a body = stall
    pub read_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

static HTTP_CONFIG: OnceLock<HttpConfig> = OnceLock::new();

/// Install the global transport config. Only the first call takes effect.
pub fn set_http_config(config: HttpConfig) {
    if HTTP_CONFIG.set(config).is_err() {
        log::debug!("HTTP config already set, ignoring");
    }
}

/// Current transport config (defaults if never set)
pub fn http_config() -> HttpConfig {
    HTTP_CONFIG.get().copied().unwrap_or_default()
}

/// Error types for transport operations
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Server answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    /// Connection-level failure (DNS, TLS, reset, body stream error)
    #[error("HTTP error: {0}")]
    Transport(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl StreamError {
    /// Create error from reqwest error, keeping the status code when there is one
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        match e.status() {
            Some(s) => Self::Status {
                status: s.as_u16(),
                message: e.to_string(),
            },
            None => Self::Transport(e.to_string()),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            // 400/401/403 = missing or expired access, 404/410 = object gone
            Self::Status { status, .. } => !matches!(status, 400 | 401 | 403 | 404 | 410),
            Self::Transport(_) => true,
            Self::Io(e) => e.kind() != io::ErrorKind::StorageFull,
        }
    }
}

/// Shared async HTTP client with connection pooling.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    let config = http_config();
    reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .pool_max_idle_per_host(16)
        .build()
        .unwrap_or_else(|e| {
            log::warn!("failed to build tuned HTTP client ({e}), using defaults");
            reqwest::Client::new()
        })
});

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// GET a URL and return the body as text (listings, small documents)
pub fn get_text(url: reqwest::Url) -> Result<String, StreamError> {
    let read_timeout = http_config().read_timeout;
    SHARED_RUNTIME.handle().block_on(async {
        let response = SHARED_CLIENT
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| StreamError::from_reqwest(&e))?;

        match tokio::time::timeout(read_timeout, response.text()).await {
            Ok(body) => body.map_err(|e| StreamError::from_reqwest(&e)),
            Err(_) => Err(timed_out(read_timeout)),
        }
    })
}

/// Stream a URL into `dest`, truncating any existing file.
///
/// Returns the number of bytes written. On error the file may be left
/// partially written; callers detect that by size on the next run.
pub fn download_to_file(url: reqwest::Url, dest: &Path) -> Result<u64, StreamError> {
    let read_timeout = http_config().read_timeout;
    SHARED_RUNTIME.handle().block_on(async {
        let mut response = SHARED_CLIENT
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| StreamError::from_reqwest(&e))?;

        let mut file = File::create(dest)?;
        let mut written = 0u64;
        loop {
            let chunk = match tokio::time::timeout(read_timeout, response.chunk()).await {
                Ok(chunk) => chunk.map_err(|e| StreamError::from_reqwest(&e))?,
                Err(_) => return Err(timed_out(read_timeout)),
            };
            let Some(bytes) = chunk else { break };
            file.write_all(&bytes)?;
            written += bytes.len() as u64;
        }
        file.flush()?;
        Ok(written)
    })
}

fn timed_out(after: Duration) -> StreamError {
    StreamError::Io(io::Error::new(
        io::ErrorKind::TimedOut,
        format!("read timeout ({}s with no data)", after.as_secs()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_err(status: u16) -> StreamError {
        StreamError::Status {
            status,
            message: "test".to_string(),
        }
    }

    #[test]
    fn http_403_not_retryable() {
        assert!(!status_err(403).is_retryable());
    }

    #[test]
    fn http_404_not_retryable() {
        assert!(!status_err(404).is_retryable());
    }

    #[test]
    fn http_500_retryable() {
        assert!(status_err(500).is_retryable());
    }

    #[test]
    fn http_429_retryable() {
        assert!(status_err(429).is_retryable());
    }

    #[test]
    fn transport_retryable() {
        assert!(StreamError::Transport("connection refused".into()).is_retryable());
    }

    #[test]
    fn io_timeout_retryable() {
        let err = StreamError::Io(io::Error::new(io::ErrorKind::TimedOut, "timeout"));
        assert!(err.is_retryable());
    }

    #[test]
    fn io_storage_full_not_retryable() {
        let err = StreamError::Io(io::Error::new(io::ErrorKind::StorageFull, "disk full"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn display_status() {
        assert_eq!(format!("{}", status_err(404)), "HTTP 404: test");
    }

    #[test]
    fn display_transport() {
        let err = StreamError::Transport("timeout".into());
        assert_eq!(format!("{err}"), "HTTP error: timeout");
    }

    #[test]
    fn default_http_config() {
        let c = HttpConfig::default();
        assert_eq!(c.connect_timeout, Duration::from_secs(30));
        assert_eq!(c.read_timeout, Duration::from_secs(30));
    }
}
