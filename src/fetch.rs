use crate::error::BoxError;
use crate::headers::Headers;
use async_trait::async_trait;
use std::path::Path;

///
/// Loads file stubs. `LocalFilesystem` reads from disk, tests can swap in their own.
///
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Whether `path` names a readable regular file.
    async fn is_file(&self, path: &Path) -> bool;

    /// Reads the full content of `path`.
    async fn read(&self, path: &Path) -> Result<Vec<u8>, BoxError>;
}

///
/// Reads file stubs from the local disk. Relative paths resolve against the working directory.
///
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFilesystem;

#[async_trait]
impl Filesystem for LocalFilesystem {
    async fn is_file(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|metadata| metadata.is_file())
            .unwrap_or(false)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>, BoxError> {
        Ok(tokio::fs::read(path).await?)
    }
}

///
/// A response obtained for a remote URL stub.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RemoteResponse {
    /// The status code, redirects are not followed
    pub status: u16,
    /// The response headers
    pub headers: Headers,
    /// The raw body
    pub body: Vec<u8>,
}

///
/// Fetches remote URL stubs.
///
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issues a `GET` for `url`.
    async fn fetch(&self, url: &str) -> Result<RemoteResponse, BoxError>;
}

///
/// A `Fetcher` that refuses every URL, so URL stubs fall back to literal text.
///
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFetcher;

#[async_trait]
impl Fetcher for NoFetcher {
    async fn fetch(&self, url: &str) -> Result<RemoteResponse, BoxError> {
        Err(format!("remote stubs are disabled, not fetching {}", url).into())
    }
}

#[cfg(feature = "remote")]
pub use self::remote::HyperFetcher;

#[cfg(feature = "remote")]
mod remote {
    use super::{Fetcher, RemoteResponse};
    use crate::error::BoxError;
    use crate::headers::Headers;
    use async_trait::async_trait;
    use bytes::Bytes;
    use http_body_util::{BodyExt, Empty};
    use hyper_rustls::{ConfigBuilderExt, HttpsConnector};
    use hyper_util::client::legacy::connect::HttpConnector;
    use hyper_util::client::legacy::Client;
    use hyper_util::rt::TokioExecutor;

    ///
    /// Fetches remote URL stubs with a hyper client over `http` or `https`. TLS goes through
    /// rustls with the bundled webpki roots. Redirects are returned as they are, so a
    /// `Location` header ends up in the stubbed response.
    ///
    #[derive(Clone, Debug)]
    pub struct HyperFetcher {
        client: Client<HttpsConnector<HttpConnector>, Empty<Bytes>>,
    }

    impl HyperFetcher {
        /// Creates a fetcher with its own connection pool.
        pub fn new() -> Self {
            let mut http_connector = HttpConnector::new();
            http_connector.enforce_http(false);

            let tls = rustls::ClientConfig::builder()
                .with_webpki_roots()
                .with_no_client_auth();

            let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
                .with_tls_config(tls)
                .https_or_http()
                .enable_http1()
                .wrap_connector(http_connector);

            Self {
                client: Client::builder(TokioExecutor::new()).build(https_connector),
            }
        }
    }

    impl Default for HyperFetcher {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl Fetcher for HyperFetcher {
        async fn fetch(&self, url: &str) -> Result<RemoteResponse, BoxError> {
            let uri: hyper::Uri = url.parse()?;
            let response = self.client.get(uri).await?;

            let status = response.status().as_u16();
            let headers: Headers = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect();
            let body = response.into_body().collect().await?.to_bytes().to_vec();

            Ok(RemoteResponse {
                status,
                headers,
                body,
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::{Fetcher, HyperFetcher};
        use std::error::Error;

        #[tokio::test]
        async fn test_https_urls_are_dialed() {
            // nothing listens on the discard port, the connection itself has to fail
            let err = HyperFetcher::new()
                .fetch("https://127.0.0.1:9/image.svg")
                .await
                .unwrap_err();

            let mut messages = vec![err.to_string()];
            let mut source = err.source();
            while let Some(cause) = source {
                messages.push(cause.to_string());
                source = cause.source();
            }

            assert!(
                messages.iter().all(|message| !message.contains("scheme is not http")),
                "{:?}",
                messages
            );
        }
    }
}
