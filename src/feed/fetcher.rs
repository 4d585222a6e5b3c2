use crate::config::Config;
use crate::error::Error;
use crate::feed::model::Feed;
use crate::feed::normalize::normalize;
use crate::feed::parser::parse_feed;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur while retrieving a feed.
///
/// None of these are retried; the first failure is handed back to the caller.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with a status outside 200-299
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Local feed file could not be read
    #[error("Failed to read feed file: {0}")]
    Io(#[from] std::io::Error),
    /// Document could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(String),
    /// Document parsed but carried no channel-level data
    #[error("Feed has no channel metadata")]
    EmptyFeed,
    /// Response body exceeded the configured size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Source is neither an HTTP(S) URL nor a local path
    #[error("Unsupported feed source: {0}")]
    InvalidSource(String),
}

/// A retrieved document and the status it came with.
///
/// Local files always report status 200.
#[derive(Debug, Clone)]
pub struct Document {
    pub status: u16,
    pub body: Vec<u8>,
}

#[derive(Debug)]
enum Source {
    Http(Url),
    File(PathBuf),
}

/// Retrieves feed documents over HTTP or from disk.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: usize,
}

impl Fetcher {
    /// Builds a fetcher with its own HTTP client.
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Builds a fetcher around a caller-configured client.
    pub fn with_client(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            timeout: Duration::from_secs(config.timeout_secs),
            max_bytes: usize::try_from(config.max_feed_bytes).unwrap_or(usize::MAX),
        }
    }

    /// Retrieves the raw document behind `source`.
    ///
    /// Non-success HTTP statuses are reported in [`Document::status`] with an
    /// empty body rather than as an error; judging them is left to
    /// [`Fetcher::fetch_and_prepare_feed`].
    pub async fn retrieve(&self, source: &str) -> Result<Document, FetchError> {
        match classify_source(source)? {
            Source::Http(url) => tokio::time::timeout(self.timeout, self.download(url))
                .await
                .map_err(|_| FetchError::Timeout)?,
            Source::File(path) => self.read_file(path).await,
        }
    }

    /// Fetches, parses, and normalizes the feed at `source`.
    ///
    /// # Errors
    ///
    /// - [`FetchError::HttpStatus`] - status outside 200-299
    /// - [`FetchError::Parse`] - not an RSS/Atom document
    /// - [`FetchError::EmptyFeed`] - no channel metadata at all
    /// - any other [`FetchError`] from retrieval
    /// - a lookup error when an entry has no publish time
    pub async fn fetch_and_prepare_feed(&self, source: &str) -> Result<Feed, Error> {
        let document = self.retrieve(source).await?;

        if !(200..300).contains(&document.status) {
            tracing::warn!(source = %source, status = document.status, "Feed fetch returned non-success status");
            return Err(FetchError::HttpStatus(document.status).into());
        }

        let feed = parse_feed(&document.body).map_err(|e| FetchError::Parse(e.to_string()))?;
        if feed.metadata.is_empty() {
            return Err(FetchError::EmptyFeed.into());
        }

        let feed = normalize(feed)?;
        tracing::debug!(
            source = %source,
            bytes = document.body.len(),
            entries = feed.entries.len(),
            "Fetched and normalized feed"
        );
        Ok(feed)
    }

    async fn download(&self, url: Url) -> Result<Document, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Ok(Document {
                status: status.as_u16(),
                body: Vec::new(),
            });
        }

        let body = read_limited_bytes(response, self.max_bytes).await?;
        Ok(Document {
            status: status.as_u16(),
            body,
        })
    }

    async fn read_file(&self, path: PathBuf) -> Result<Document, FetchError> {
        let meta = tokio::fs::metadata(&path).await?;
        if meta.len() > self.max_bytes as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
        let body = tokio::fs::read(&path).await?;
        Ok(Document { status: 200, body })
    }
}

/// Splits a source string into an HTTP(S) URL or a filesystem path.
fn classify_source(source: &str) -> Result<Source, FetchError> {
    match Url::parse(source) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(Source::Http(url)),
            "file" => url
                .to_file_path()
                .map(Source::File)
                .map_err(|()| FetchError::InvalidSource(source.to_owned())),
            // Windows drive letters parse as one-letter schemes
            scheme if scheme.len() == 1 => Ok(Source::File(PathBuf::from(source))),
            _ => Err(FetchError::InvalidSource(source.to_owned())),
        },
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Source::File(PathBuf::from(source))),
        Err(e) => Err(FetchError::InvalidSource(format!("{source}: {e}"))),
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Test</title>
    <link>https://example.com/</link>
    <item>
        <title>First</title>
        <link>https://example.com/1</link>
        <pubDate>Tue, 02 Jan 2024 10:00:00 GMT</pubDate>
    </item>
</channel></rss>"#;

    fn fetcher() -> Fetcher {
        Fetcher::new(&Config::default()).unwrap()
    }

    async fn serve(template: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(template)
            .mount(&mock_server)
            .await;
        mock_server
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mock_server = serve(
            ResponseTemplate::new(200)
                .set_body_string(VALID_RSS)
                .insert_header("Content-Type", "application/xml"),
        )
        .await;

        let feed = fetcher()
            .fetch_and_prepare_feed(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(feed.entries.len(), 1);
        assert!(feed.entries[0].pubdate().is_some());
    }

    #[tokio::test]
    async fn test_fetch_404_error() {
        let mock_server = serve(ResponseTemplate::new(404)).await;

        let result = fetcher()
            .fetch_and_prepare_feed(&format!("{}/feed", mock_server.uri()))
            .await;
        match result.unwrap_err() {
            Error::Fetch(FetchError::HttpStatus(404)) => {}
            e => panic!("Expected HttpStatus(404), got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_fetch_500_is_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = fetcher()
            .fetch_and_prepare_feed(&format!("{}/feed", mock_server.uri()))
            .await;
        assert!(matches!(
            result,
            Err(Error::Fetch(FetchError::HttpStatus(500)))
        ));
    }

    #[tokio::test]
    async fn test_retrieve_reports_status_without_error() {
        let mock_server = serve(ResponseTemplate::new(410)).await;

        let document = fetcher()
            .retrieve(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(document.status, 410);
        assert!(document.body.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_feed_parse_error() {
        let mock_server = serve(ResponseTemplate::new(200).set_body_string("<not valid xml")).await;

        let result = fetcher()
            .fetch_and_prepare_feed(&format!("{}/feed", mock_server.uri()))
            .await;
        match result.unwrap_err() {
            Error::Fetch(FetchError::Parse(_)) => {}
            e => panic!("Expected Parse error, got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_empty_channel_is_fetch_error() {
        let empty_rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel></channel></rss>"#;
        let mock_server = serve(ResponseTemplate::new(200).set_body_string(empty_rss)).await;

        let result = fetcher()
            .fetch_and_prepare_feed(&format!("{}/feed", mock_server.uri()))
            .await;
        assert!(matches!(result, Err(Error::Fetch(FetchError::EmptyFeed))));
    }

    #[tokio::test]
    async fn test_response_too_large() {
        let mock_server = serve(ResponseTemplate::new(200).set_body_string(VALID_RSS)).await;
        let config = Config {
            max_feed_bytes: 16,
            ..Config::default()
        };
        let fetcher = Fetcher::new(&config).unwrap();

        let result = fetcher.retrieve(&format!("{}/feed", mock_server.uri())).await;
        assert!(matches!(result, Err(FetchError::ResponseTooLarge)));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let mock_server = serve(
            ResponseTemplate::new(200)
                .set_body_string(VALID_RSS)
                .set_delay(Duration::from_secs(3)),
        )
        .await;
        let config = Config {
            timeout_secs: 1,
            ..Config::default()
        };
        let fetcher = Fetcher::new(&config).unwrap();

        let result = fetcher.retrieve(&format!("{}/feed", mock_server.uri())).await;
        assert!(matches!(result, Err(FetchError::Timeout)));
    }

    #[tokio::test]
    async fn test_local_file_source() {
        let dir = std::env::temp_dir().join("rssfilter_fetcher_test_local");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("feed.xml");
        std::fs::write(&path, VALID_RSS).unwrap();

        let feed = fetcher()
            .fetch_and_prepare_feed(path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(feed.links(), vec!["https://example.com/1"]);
    }

    #[tokio::test]
    async fn test_missing_local_file_is_io_error() {
        let result = fetcher()
            .retrieve("/tmp/rssfilter_definitely_missing_feed.xml")
            .await;
        assert!(matches!(result, Err(FetchError::Io(_))));
    }

    #[test]
    fn test_classify_source() {
        assert!(matches!(
            classify_source("https://example.com/feed"),
            Ok(Source::Http(_))
        ));
        assert!(matches!(
            classify_source("feeds/local.xml"),
            Ok(Source::File(_))
        ));
        assert!(matches!(
            classify_source("file:///tmp/feed.xml"),
            Ok(Source::File(_))
        ));
        assert!(matches!(
            classify_source("ftp://example.com/feed"),
            Err(FetchError::InvalidSource(_))
        ));
    }
}
