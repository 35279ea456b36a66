//! Resource resolution: turning URLs into inline `data:` URIs.

use crate::{Error, Result};
use base64::Engine as Base64Engine;
use futures::future::{FutureExt, LocalBoxFuture};
use std::collections::HashMap;

/// Resolves a URL to an inline data URI.
///
/// Used for video posters. Implementations decide where bytes come from
/// (network, cache, fixtures).
pub trait ResourceResolver {
    /// Resolve `url`; `mime` is the type derived from the URL's extension,
    /// empty when unknown.
    fn resolve<'a>(&'a self, url: &'a str, mime: &'a str) -> LocalBoxFuture<'a, Result<String>>;
}

/// MIME type derived from the extension of `url`, empty when unknown.
pub fn mime_type(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "tif" | "tiff" => "image/tiff",
        "avif" => "image/avif",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        _ => "",
    }
}

/// Base64 `data:` URI for `bytes`.
pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Serves resources from an in-memory table.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    entries: HashMap<String, Vec<u8>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(url, bytes);
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(url.into(), bytes.into());
    }
}

impl ResourceResolver for StaticResolver {
    fn resolve<'a>(&'a self, url: &'a str, mime: &'a str) -> LocalBoxFuture<'a, Result<String>> {
        let result = match self.entries.get(url) {
            Some(bytes) => Ok(to_data_uri(mime, bytes)),
            None => Err(Error::ResourceError {
                url: url.to_string(),
                reason: "not found".to_string(),
            }),
        };
        futures::future::ready(result).boxed_local()
    }
}

#[cfg(feature = "fetch")]
pub use fetch::FetchResolver;

#[cfg(feature = "fetch")]
mod fetch {
    use super::{to_data_uri, ResourceResolver};
    use crate::{Error, Result};
    use futures::future::{FutureExt, LocalBoxFuture};
    use std::time::Duration;

    /// Fetches resources over HTTP.
    #[derive(Debug, Clone)]
    pub struct FetchResolver {
        client: reqwest::Client,
    }

    impl FetchResolver {
        pub fn new(timeout_ms: u64) -> Result<Self> {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_millis(timeout_ms))
                .build()
                .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
            Ok(Self { client })
        }

        async fn fetch(&self, url: &str, mime: &str) -> Result<String> {
            log::debug!("fetching {}", url);
            let response = self.client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::ResourceError {
                    url: url.to_string(),
                    reason: format!("HTTP {}", status.as_u16()),
                });
            }

            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());
            let bytes = response.bytes().await?;
            let mime = match (mime, content_type) {
                ("", Some(ct)) => ct,
                (mime, _) => mime.to_string(),
            };
            Ok(to_data_uri(&mime, &bytes))
        }
    }

    impl ResourceResolver for FetchResolver {
        fn resolve<'a>(&'a self, url: &'a str, mime: &'a str) -> LocalBoxFuture<'a, Result<String>> {
            self.fetch(url, mime).boxed_local()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_type("https://x.test/a/poster.PNG?v=2"), "image/png");
        assert_eq!(mime_type("poster.jpeg#frag"), "image/jpeg");
        assert_eq!(mime_type("https://x.test/poster"), "");
    }

    #[test]
    fn data_uri_is_base64() {
        assert_eq!(to_data_uri("image/png", b"hi"), "data:image/png;base64,aGk=");
    }

    #[tokio::test]
    async fn static_resolver_serves_known_urls() {
        let resolver = StaticResolver::new().with("poster.png", b"hi".to_vec());
        assert_eq!(
            resolver.resolve("poster.png", "image/png").await.unwrap(),
            "data:image/png;base64,aGk="
        );
        assert!(matches!(
            resolver.resolve("other.png", "image/png").await,
            Err(Error::ResourceError { .. })
        ));
    }
}
