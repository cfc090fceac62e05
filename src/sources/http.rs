use crate::config::Config;
use crate::errors::{QuoteBoardError, Result};
use crate::models::quote::QuoteSnapshot;
use crate::sources::base::QuoteSource;
use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::Client;

/// 通过 HTTP 拉取行情快照
pub struct HttpQuoteSource {
    client: Client,
    url: String,
}

impl HttpQuoteSource {
    /// Build a source for `config.endpoint_url()`.
    ///
    /// No timeout is applied unless the config sets one; the request then waits as long
    /// as the connection stays open.
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(QuoteBoardError::RequestError)?;

        Ok(Self {
            client,
            url: config.endpoint_url(),
        })
    }
}

#[async_trait]
impl QuoteSource for HttpQuoteSource {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn fetch_snapshot(&self) -> Result<QuoteSnapshot> {
        debug!("GET {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(QuoteBoardError::RequestError)?;

        let status = response.status();
        if !status.is_success() {
            error!("HTTP error from {}: status {}", self.url, status);
            return Err(QuoteBoardError::HttpStatus(status.as_u16()));
        }

        let text = response.text().await?;
        let snapshot = QuoteSnapshot::from_json(&text)?;

        info!("Fetched {} quotes from {}", snapshot.len(), self.url);
        Ok(snapshot)
    }
}
