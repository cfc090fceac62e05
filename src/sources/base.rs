use crate::errors::Result;
use crate::models::quote::QuoteSnapshot;
use async_trait::async_trait;

/// Base trait for quote snapshot sources
#[async_trait]
pub trait QuoteSource {
    /// Where the snapshot comes from, for log lines
    fn endpoint(&self) -> &str;

    /// Fetch one complete snapshot.
    /// Any failure, transport, HTTP status or body parsing, is returned as an error.
    async fn fetch_snapshot(&self) -> Result<QuoteSnapshot>;
}
