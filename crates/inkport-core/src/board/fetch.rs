//! Payload fetchers.
//!
//! A [`Fetcher`] turns a [`Locator`] into payload text. Fetches have two
//! terminal outcomes, text or [`FetchError`]; the wall-clock budget is
//! enforced by the caller.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::Locator;

/// Fetch failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The host answered with a non-success status code
    #[error("request failed with status {code}: {message}")]
    Status {
        /// Status code
        code: u16,
        /// Reason phrase or body excerpt
        message: String,
    },
    /// The request could not be completed
    #[error("request failed: {0}")]
    Transport(String),
    /// No outcome within the time budget
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    /// The payload was empty
    #[error("empty response body")]
    Empty,
    /// Local file does not exist
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// Local file could not be read
    #[error("failed to read {}: {message}", .path.display())]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying error
        message: String,
    },
    /// No fetcher handles the locator's scheme
    #[error("unsupported locator scheme '{0}'")]
    UnsupportedScheme(String),
}

impl FetchError {
    /// Status code, for transport failures that carry one.
    #[must_use]
    pub const fn code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Retrieves payload text for a locator.
///
/// The returned future must not borrow the fetcher or the locator so it can
/// be spawned onto the runtime.
pub trait Fetcher {
    /// Fetch the payload at `locator`.
    fn fetch(&self, locator: &Locator)
        -> impl Future<Output = Result<String, FetchError>> + Send + 'static;
}

/// Reads payloads from the local filesystem.
///
/// Accepts plain paths and `file://` locators.
#[derive(Debug, Clone, Default)]
pub struct FileFetcher;

impl FileFetcher {
    /// Path a locator refers to.
    #[must_use]
    pub fn path_of(locator: &Locator) -> PathBuf {
        let text = locator.as_str();
        let path = text
            .strip_prefix("file://")
            .or_else(|| text.strip_prefix("FILE://"))
            .unwrap_or(text);
        PathBuf::from(path)
    }
}

impl Fetcher for FileFetcher {
    fn fetch(
        &self,
        locator: &Locator,
    ) -> impl Future<Output = Result<String, FetchError>> + Send + 'static {
        let path = Self::path_of(locator);
        async move {
            tracing::debug!("Reading payload from {}", path.display());
            let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    FetchError::NotFound(path.clone())
                } else {
                    FetchError::Read {
                        path: path.clone(),
                        message: e.to_string(),
                    }
                }
            })?;
            non_empty(text)
        }
    }
}

/// Fetches payloads over HTTP(S).
#[cfg(feature = "http")]
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    /// Create a fetcher with a fresh client.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a fetcher sharing an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "http")]
impl Fetcher for HttpFetcher {
    fn fetch(
        &self,
        locator: &Locator,
    ) -> impl Future<Output = Result<String, FetchError>> + Send + 'static {
        let client = self.client.clone();
        let url = locator.as_str().to_string();
        async move {
            tracing::debug!("Downloading payload from {}", url);
            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    code: status.as_u16(),
                    message: status.canonical_reason().unwrap_or("unknown").to_string(),
                });
            }

            let text = response
                .text()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;
            non_empty(text)
        }
    }
}

/// Dispatches to the file or HTTP fetcher by locator scheme.
#[derive(Debug, Clone, Default)]
pub struct AnyFetcher {
    file: FileFetcher,
    #[cfg(feature = "http")]
    http: HttpFetcher,
}

impl AnyFetcher {
    /// Create a dispatching fetcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Fetcher for AnyFetcher {
    fn fetch(
        &self,
        locator: &Locator,
    ) -> impl Future<Output = Result<String, FetchError>> + Send + 'static {
        let locator = locator.clone();
        let file = self.file.clone();
        #[cfg(feature = "http")]
        let http = self.http.clone();
        async move {
            match locator.scheme().as_deref() {
                None | Some("file") => file.fetch(&locator).await,
                #[cfg(feature = "http")]
                Some("http" | "https") => http.fetch(&locator).await,
                Some(other) => Err(FetchError::UnsupportedScheme(other.to_string())),
            }
        }
    }
}

fn non_empty(text: String) -> Result<String, FetchError> {
    if text.trim().is_empty() {
        Err(FetchError::Empty)
    } else {
        Ok(text)
    }
}
