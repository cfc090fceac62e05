use crate::errors::Result;
use crate::util;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;

/// Display fallback for a quote without a company name.
pub const MISSING_NAME: &str = "N/A";

/// One quote as served by the snapshot endpoint.
///
/// `close` and `percent_change` arrive as numbers or numeric strings depending on the
/// upstream feed; both are normalized here into exact decimals. Anything that does not
/// read as a number becomes `None` and is rendered as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRecord {
    pub symbol: String,
    pub name: Option<String>,
    pub close: Option<Decimal>,
    pub percent_change: Option<Decimal>,
}

impl QuoteRecord {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: None,
            close: None,
            percent_change: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string()).filter(|n| !n.is_empty());
        self
    }

    pub fn with_close(mut self, close: &str) -> Self {
        self.close = util::parse_decimal(close);
        self
    }

    pub fn with_percent_change(mut self, percent_change: &str) -> Self {
        self.percent_change = util::parse_decimal(percent_change);
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(MISSING_NAME)
    }

    pub fn display_price(&self) -> String {
        util::format_price(self.close)
    }

    pub fn display_percent_change(&self) -> String {
        util::format_fixed_2(self.percent_change)
    }
}

// 原始报文结构，symbol 缺失时由外层 key 补上
#[derive(Debug, Deserialize)]
struct RawQuote {
    #[serde(default, deserialize_with = "lenient_text")]
    symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    close: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    percent_change: Option<Decimal>,
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_decimal<'de, D>(deserializer: D) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => util::parse_decimal(&n.to_string()),
        Value::String(s) => util::parse_decimal(&s),
        _ => None,
    })
}

/// Every quote from one response of the snapshot endpoint, keyed by symbol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteSnapshot {
    quotes: HashMap<String, QuoteRecord>,
}

impl QuoteSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a response body. The body must be a JSON object whose values are quote objects.
    pub fn from_json(body: &str) -> Result<Self> {
        let raw: HashMap<String, RawQuote> = serde_json::from_str(body)?;

        let quotes = raw
            .into_iter()
            .map(|(key, quote)| {
                let record = QuoteRecord {
                    symbol: quote.symbol.unwrap_or_else(|| key.clone()),
                    name: quote.name,
                    close: quote.close,
                    percent_change: quote.percent_change,
                };
                (key, record)
            })
            .collect();

        Ok(Self { quotes })
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn get(&self, symbol: &str) -> Option<&QuoteRecord> {
        self.quotes
            .get(symbol)
            .or_else(|| self.quotes.values().find(|q| q.symbol == symbol))
    }

    /// All quotes ordered by symbol. Computed fresh on each call.
    pub fn sorted(&self) -> Vec<&QuoteRecord> {
        let mut list: Vec<&QuoteRecord> = self.quotes.values().collect();
        list.sort_by(|a, b| util::locale_compare(&a.symbol, &b.symbol));
        list
    }
}

impl FromIterator<QuoteRecord> for QuoteSnapshot {
    fn from_iter<I: IntoIterator<Item = QuoteRecord>>(iter: I) -> Self {
        Self {
            quotes: iter
                .into_iter()
                .map(|q| (q.symbol.clone(), q))
                .collect(),
        }
    }
}
