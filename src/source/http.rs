//! HTTP implementation of [`CatalogSource`].
//!
//! The Gaia archive exposes its partitions as a plain HTML index page, so
//! listing is a matter of pulling `href` targets out of the page and keeping
//! the ones with the right extension.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use regex::Regex;
use snafu::prelude::*;

use super::{CatalogSource, RemoteRead};
use crate::error::{ClientBuildSnafu, RequestSnafu, SourceError};

/// Catalog archive reached over HTTP.
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
    href: Regex,
}

impl HttpSource {
    /// Create a source rooted at an HTTP directory URL.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            // unwrap: pattern is a compile-time constant
            href: Regex::new(r#"href="([^"]+)""#).unwrap(),
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, SourceError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context(RequestSnafu { url })?;
        let status = response.status();
        ensure!(
            status.is_success(),
            crate::error::HttpStatusSnafu {
                url,
                status: status.as_u16(),
            }
        );
        Ok(response)
    }
}

#[async_trait]
impl CatalogSource for HttpSource {
    async fn list(&self, extension: &str) -> Result<Vec<String>, SourceError> {
        let url = format!("{}/", self.base_url);
        let page = self
            .get(&url)
            .await?
            .text()
            .await
            .context(RequestSnafu { url })?;

        Ok(self
            .href
            .captures_iter(&page)
            .map(|c| c[1].to_string())
            .filter(|target| target.ends_with(extension))
            .map(|target| format!("{}/{}", self.base_url, target))
            .collect())
    }

    async fn open(&self, url: &str) -> Result<RemoteRead, SourceError> {
        let response = self.get(url).await?;
        let declared_len = response.content_length().unwrap_or(0);
        let stream = response
            .bytes_stream()
            .map_err(|e| SourceError::Interrupted {
                message: e.to_string(),
            });
        Ok(RemoteRead {
            declared_len,
            stream: Box::pin(stream),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const INDEX: &str = r#"<html><body>
<a href="../">Parent</a>
<a href="GaiaSource_000000-003111.csv.gz">GaiaSource_000000-003111.csv.gz</a>
<a href="GaiaSource_003112-005263.csv.gz">GaiaSource_003112-005263.csv.gz</a>
<a href="MD5SUM.txt">MD5SUM.txt</a>
</body></html>"#;

    #[tokio::test]
    async fn test_list_filters_by_extension() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gaia_source/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(INDEX))
            .mount(&server)
            .await;

        let source =
            HttpSource::new(&format!("{}/gaia_source", server.uri()), Duration::from_secs(5))
                .unwrap();
        let files = source.list("gz").await.unwrap();

        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("/gaia_source/GaiaSource_000000-003111.csv.gz"));
        assert!(files[1].ends_with("/gaia_source/GaiaSource_003112-005263.csv.gz"));
    }

    #[tokio::test]
    async fn test_list_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = HttpSource::new(&server.uri(), Duration::from_secs(5)).unwrap();
        assert!(matches!(
            source.list("gz").await,
            Err(SourceError::HttpStatus { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_open_reports_declared_length() {
        let server = MockServer::start().await;
        let body = vec![7u8; 4096];
        Mock::given(method("GET"))
            .and(path("/file.csv.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let source = HttpSource::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let mut read = source
            .open(&format!("{}/file.csv.gz", server.uri()))
            .await
            .unwrap();

        assert_eq!(read.declared_len, 4096);

        let mut received = Vec::new();
        while let Some(chunk) = read.stream.next().await {
            received.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(received, body);
    }
}
