//! Page fetching
//!
//! The service only needs "give me the HTML behind this URL". `HttpFetcher`
//! does that over the network, `FileFetcher` serves saved pages from disk.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure to obtain a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("status: {0}")]
    Status(u16),
    #[error("status: 500, err: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("page exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// HTTP status that best describes this failure
    pub fn status_code(&self) -> u16 {
        match self {
            FetchError::Status(code) => *code,
            _ => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == 404
    }
}

/// Source of raw page markup
pub trait PageFetcher: Send + Sync {
    fn get_page(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Settings shared by fetcher implementations
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_page_bytes: usize,
}

/// Fetches pages over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_page_bytes: usize,
}

impl HttpFetcher {
    pub fn new(options: &FetchOptions) -> Result<Self, FetchError> {
        // A desktop browser User-Agent is what keeps the product pages from
        // being replaced by a captcha.
        let client = reqwest::Client::builder()
            .user_agent(options.user_agent.as_str())
            .timeout(options.timeout)
            .build()?;

        Ok(Self {
            client,
            max_page_bytes: options.max_page_bytes,
        })
    }
}

impl PageFetcher for HttpFetcher {
    async fn get_page(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        let limit = self.max_page_bytes;
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(FetchError::TooLarge { limit });
        }

        let body = response.bytes().await?;
        if body.len() > limit {
            return Err(FetchError::TooLarge { limit });
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// Serves pages saved as `<root>/<last url segment>.html`
#[derive(Debug, Clone)]
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// File that backs `url`
    pub fn page_path(&self, url: &str) -> PathBuf {
        let path = url.split(&['?', '#'][..]).next().unwrap_or(url);
        let name = path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();
        self.root.join(format!("{}.html", name))
    }
}

impl PageFetcher for FileFetcher {
    async fn get_page(&self, url: &str) -> Result<String, FetchError> {
        let path = self.page_path(url);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::Status(404)),
            Err(source) => Err(FetchError::Io { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn pages_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/pages")
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(FetchError::Status(404).status_code(), 404);
        assert!(FetchError::Status(404).is_not_found());
        assert_eq!(FetchError::TooLarge { limit: 1 }.status_code(), 500);
        assert_eq!(FetchError::Status(503).to_string(), "status: 503");
    }

    #[test]
    fn test_page_path() {
        let fetcher = FileFetcher::new("/pages");
        assert_eq!(
            fetcher.page_path("https://www.amazon.de/gp/product/B08MZ3B1KC"),
            PathBuf::from("/pages/B08MZ3B1KC.html")
        );
        assert_eq!(
            fetcher.page_path("https://www.amazon.de/gp/product/B08MZ3B1KC/?ref=x"),
            PathBuf::from("/pages/B08MZ3B1KC.html")
        );
    }

    #[tokio::test]
    async fn test_file_fetcher_reads_page() {
        let fetcher = FileFetcher::new(pages_dir());
        let page = fetcher
            .get_page("https://www.amazon.de/gp/product/B08MZ3B1KC")
            .await
            .unwrap();
        assert!(page.contains("Mercy Black"));
    }

    #[tokio::test]
    async fn test_file_fetcher_missing_page_is_not_found() {
        let fetcher = FileFetcher::new(pages_dir());
        let err = fetcher
            .get_page("https://www.amazon.de/gp/product/B000000000")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_http_fetcher_builds() {
        let options = FetchOptions {
            user_agent: "pipi-test".to_string(),
            timeout: Duration::from_secs(5),
            max_page_bytes: 1024,
        };
        assert!(HttpFetcher::new(&options).is_ok());
    }
}
