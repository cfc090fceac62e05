use crate::models::quote::QuoteSnapshot;
use chrono::{DateTime, Local};

/// The only message a user sees when a load fails, whatever the cause.
pub const LOAD_FAILED_MESSAGE: &str = "failed to load data, possible API limit or server issue";

/// Lifecycle of the stock list: waiting for the first response, failed, or showing data.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ViewState {
    #[default]
    Pending,
    Failed(String),
    Ready {
        snapshot: QuoteSnapshot,
        fetched_at: DateTime<Local>,
    },
}

impl ViewState {
    pub fn is_pending(&self) -> bool {
        matches!(self, ViewState::Pending)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ViewState::Ready { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ViewState::Failed(_))
    }

    pub fn snapshot(&self) -> Option<&QuoteSnapshot> {
        match self {
            ViewState::Ready { snapshot, .. } => Some(snapshot),
            _ => None,
        }
    }
}
