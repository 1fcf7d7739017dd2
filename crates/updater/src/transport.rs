use crate::error::{Result, UpdaterError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::Client;
use std::time::Duration;

/// Stream of body chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Abstraction over issuing GET requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the whole body at `url`. Non-success statuses are errors.
    async fn get_bytes(&self, url: &str) -> Result<Bytes>;

    /// Open a streaming read of the body at `url`.
    async fn get_stream(&self, url: &str) -> Result<ByteStream>;
}

/// Builder for [`HttpTransport`].
#[derive(Default)]
pub struct HttpTransportBuilder {
    client: Option<Client>,
    user_agent: Option<String>,
    timeout: Option<Duration>,
}

impl HttpTransportBuilder {
    /// Provide a custom reqwest client instance. Overrides the user agent and timeout settings.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// User agent sent with every request.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Total timeout per request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<HttpTransport> {
        if let Some(client) = self.client {
            return Ok(HttpTransport { client });
        }

        let mut builder = Client::builder().user_agent(
            self.user_agent
                .unwrap_or_else(|| format!("updater/{}", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(HttpTransport {
            client: builder.build()?,
        })
    }
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a new builder.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpdaterError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_bytes(&self, url: &str) -> Result<Bytes> {
        let response = self.send(url).await?;
        Ok(response.bytes().await?)
    }

    async fn get_stream(&self, url: &str) -> Result<ByteStream> {
        let response = self.send(url).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(UpdaterError::from))
            .boxed())
    }
}
