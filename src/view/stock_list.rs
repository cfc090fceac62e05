use crate::sources::base::QuoteSource;
use crate::view::render::{Rendered, StockCard};
use crate::view::state::{ViewState, LOAD_FAILED_MESSAGE};
use chrono::Local;
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

struct Inner {
    source: Arc<dyn QuoteSource + Send + Sync>,
    state: watch::Sender<ViewState>,
    mounted: watch::Sender<bool>,
    // 最近一次发出的请求编号；检查与写入 state 都在这把锁下完成
    issued: Mutex<u64>,
}

/// The stock list view model.
///
/// Clones share one state. Each `load()` takes a fresh request id; a response is applied
/// only while the view is mounted and no newer load has been issued since, so a slow
/// early response never overwrites a later one.
#[derive(Clone)]
pub struct StockListView {
    inner: Arc<Inner>,
}

impl StockListView {
    /// Create a view in the `Pending` state without loading anything.
    pub fn new(source: Arc<dyn QuoteSource + Send + Sync>) -> Self {
        let (state, _) = watch::channel(ViewState::Pending);
        let (mounted, _) = watch::channel(true);

        Self {
            inner: Arc::new(Inner {
                source,
                state,
                mounted,
                issued: Mutex::new(0),
            }),
        }
    }

    /// Create a view and run its initial load.
    pub async fn mount(source: Arc<dyn QuoteSource + Send + Sync>) -> Self {
        let view = Self::new(source);
        view.load().await;
        view
    }

    /// Fetch a snapshot and settle the state.
    ///
    /// Never fails: every fetch error is logged and becomes `Failed` with the fixed
    /// user-facing message. Returns whether the result was applied.
    pub async fn load(&self) -> bool {
        let request_id = {
            let mut issued = self.inner.issued.lock().unwrap_or_else(PoisonError::into_inner);
            if !self.is_mounted() {
                debug!("View unmounted, skipping load");
                return false;
            }
            *issued += 1;
            *issued
        };

        let endpoint = self.inner.source.endpoint();
        debug!("Load #{} from {}", request_id, endpoint);

        let next = match self.inner.source.fetch_snapshot().await {
            Ok(snapshot) => ViewState::Ready {
                snapshot,
                fetched_at: Local::now(),
            },
            Err(e) => {
                error!("Failed to load quotes from {}: {}", endpoint, e);
                ViewState::Failed(LOAD_FAILED_MESSAGE.to_string())
            }
        };

        let issued = self.inner.issued.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.is_mounted() {
            debug!("Discarding load #{}: view unmounted", request_id);
            return false;
        }
        if *issued != request_id {
            debug!("Discarding stale load #{} (latest is #{})", request_id, *issued);
            return false;
        }

        if let ViewState::Ready { snapshot, .. } = &next {
            info!("Load #{} ready with {} quotes", request_id, snapshot.len());
        }
        self.inner.state.send_replace(next);
        true
    }

    pub fn state(&self) -> ViewState {
        self.inner.state.borrow().clone()
    }

    /// Watch every settled state.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.inner.state.subscribe()
    }

    pub fn render(&self) -> Rendered {
        Rendered::from_state(&self.inner.state.borrow())
    }

    /// Card for `symbol`, once data is loaded. Hook for a detail view.
    pub fn select(&self, symbol: &str) -> Option<StockCard> {
        let state = self.inner.state.borrow();
        let card = state
            .snapshot()
            .and_then(|snapshot| snapshot.get(symbol))
            .map(StockCard::from);

        match &card {
            Some(card) => info!("Selected {} ({})", card.symbol, card.name),
            None => warn!("No quote for {}", symbol),
        }
        card
    }

    pub fn is_mounted(&self) -> bool {
        *self.inner.mounted.borrow()
    }

    /// Tear the view down: pending and future responses are ignored, pollers stop.
    pub fn unmount(&self) {
        let _issued = self.inner.issued.lock().unwrap_or_else(PoisonError::into_inner);
        if self.inner.mounted.send_replace(false) {
            info!("View unmounted");
        }
    }

    /// Reload every `interval` until the returned handle is cancelled or dropped, or
    /// the view is unmounted.
    ///
    /// The first tick comes one interval from now. A load still running when the next
    /// tick fires is aborted.
    pub fn start_polling(&self, interval: Duration) -> PollHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let mounted = self.inner.mounted.subscribe();
        let view = Arc::downgrade(&self.inner);

        info!("Polling {} every {:?}", self.inner.source.endpoint(), interval);
        let task = tokio::spawn(poll_loop(view, interval, shutdown_rx, mounted));

        PollHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Running poller. Dropping it stops polling as well.
pub struct PollHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Stop polling and wait until the in-flight load, if any, has been aborted.
    pub async fn cancel(self) {
        let PollHandle { shutdown, task } = self;
        let _ = shutdown.send(());
        if let Err(e) = task.await {
            warn!("Poll task ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn poll_loop(
    view: Weak<Inner>,
    interval: Duration,
    mut shutdown: oneshot::Receiver<()>,
    mut mounted: watch::Receiver<bool>,
) {
    if !*mounted.borrow() {
        debug!("View already unmounted, not polling");
        return;
    }

    let start = Instant::now().checked_add(interval).filter(|_| !interval.is_zero());
    let Some(start) = start else {
        warn!("Polling interval {:?} is out of range, not polling", interval);
        return;
    };
    let mut ticker = interval_at(start, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut in_flight: Option<JoinHandle<bool>> = None;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = mounted.changed() => {
                if changed.is_err() || !*mounted.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let Some(inner) = view.upgrade() else { break };

                if let Some(previous) = in_flight.take() {
                    if !previous.is_finished() {
                        debug!("Previous load still running, aborting it");
                        previous.abort();
                    }
                }

                let reloading = StockListView { inner };
                in_flight = Some(tokio::spawn(async move { reloading.load().await }));
            }
        }
    }

    if let Some(task) = in_flight {
        task.abort();
        let _ = task.await;
    }
    debug!("Polling stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::errors::{QuoteBoardError, Result};
    use crate::models::quote::QuoteSnapshot;
    use crate::sources::http::tests::serve_once;
    use crate::sources::http::HttpQuoteSource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    const SAMPLE: &str = r#"{"AAPL": {"symbol":"AAPL","name":"Apple","close":"150.005","percent_change":"-0.123"}, "MSFT": {"symbol":"MSFT","close":"300"}}"#;

    /// Replays canned bodies (`Ok`) or HTTP status failures (`Err`), repeating the last one.
    struct StubSource {
        responses: Vec<std::result::Result<&'static str, u16>>,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn new(responses: Vec<std::result::Result<&'static str, u16>>) -> Arc<Self> {
            Arc::new(Self {
                responses,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QuoteSource for StubSource {
        fn endpoint(&self) -> &str {
            "stub"
        }

        async fn fetch_snapshot(&self) -> Result<QuoteSnapshot> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let idx = n.min(self.responses.len() - 1);
            match self.responses[idx] {
                Ok(body) => QuoteSnapshot::from_json(body),
                Err(status) => Err(QuoteBoardError::HttpStatus(status)),
            }
        }
    }

    /// First call blocks until released; later calls answer at once.
    #[derive(Default)]
    struct GatedSource {
        calls: AtomicUsize,
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl QuoteSource for GatedSource {
        fn endpoint(&self) -> &str {
            "gated"
        }

        async fn fetch_snapshot(&self) -> Result<QuoteSnapshot> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.started.notify_one();
                self.release.notified().await;
                QuoteSnapshot::from_json(r#"{"SLOW": {"symbol": "SLOW"}}"#)
            } else {
                QuoteSnapshot::from_json(r#"{"FAST": {"symbol": "FAST"}}"#)
            }
        }
    }

    fn symbols(view: &StockListView) -> Vec<String> {
        view.render().cards().iter().map(|c| c.symbol.clone()).collect()
    }

    #[tokio::test]
    async fn starts_pending() {
        let view = StockListView::new(StubSource::new(vec![Ok(SAMPLE)]));
        assert!(view.state().is_pending());
        assert_eq!(view.render(), Rendered::Loading);
    }

    #[tokio::test]
    async fn mount_renders_sorted_cards() {
        let source = StubSource::new(vec![Ok(SAMPLE)]);
        let view = StockListView::mount(source.clone()).await;

        assert_eq!(source.calls(), 1);
        assert!(view.state().is_ready());

        let rendered = view.render();
        let cards = rendered.cards();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].symbol, "AAPL");
        assert_eq!(cards[0].price, "$150.01");
        assert_eq!(cards[0].percent_change, "-0.12");
        assert_eq!(cards[1].symbol, "MSFT");
        assert_eq!(cards[1].name, "N/A");
        assert_eq!(cards[1].percent_change, "0.00");
    }

    #[tokio::test]
    async fn status_failure_shows_fixed_message() {
        let view = StockListView::mount(StubSource::new(vec![Err(429)])).await;

        assert_eq!(view.state(), ViewState::Failed(LOAD_FAILED_MESSAGE.to_string()));
        assert_eq!(view.render().to_string(), LOAD_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn http_500_ends_failed() {
        let base = serve_once("500 Internal Server Error", "{}").await;
        let source = HttpQuoteSource::new(&Config::new().with_base_url(&base)).unwrap();

        let view = StockListView::mount(Arc::new(source)).await;
        assert!(view.state().is_failed());
        assert_eq!(view.render(), Rendered::Message(LOAD_FAILED_MESSAGE.to_string()));
    }

    #[tokio::test]
    async fn transport_and_parse_failures_share_the_message() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let refused = HttpQuoteSource::new(&Config::new().with_base_url(&format!("http://{}", addr))).unwrap();
        let view = StockListView::mount(Arc::new(refused)).await;
        assert_eq!(view.render().to_string(), LOAD_FAILED_MESSAGE);

        let garbage = StubSource::new(vec![Ok("<html>quota exceeded</html>")]);
        let view = StockListView::mount(garbage).await;
        assert_eq!(view.render().to_string(), LOAD_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn repeated_load_is_idempotent() {
        let view = StockListView::mount(StubSource::new(vec![Ok(SAMPLE)])).await;
        let first = view.render();

        assert!(view.load().await);
        assert_eq!(view.render(), first);
        assert_eq!(view.render().cards().len(), 2);
    }

    #[tokio::test]
    async fn new_snapshot_replaces_old_one() {
        let source = StubSource::new(vec![Ok(SAMPLE), Ok(r#"{"NVDA": {"symbol": "NVDA"}}"#)]);
        let view = StockListView::mount(source).await;
        view.load().await;

        assert_eq!(symbols(&view), vec!["NVDA"]);
    }

    #[tokio::test]
    async fn failure_after_success_replaces_data() {
        let view = StockListView::mount(StubSource::new(vec![Ok(SAMPLE), Err(503)])).await;
        view.load().await;
        assert!(view.state().is_failed());
    }

    #[tokio::test]
    async fn stale_response_is_discarded() {
        let source = Arc::new(GatedSource::default());
        let view = StockListView::new(source.clone());

        let slow = tokio::spawn({
            let view = view.clone();
            async move { view.load().await }
        });
        source.started.notified().await;

        assert!(view.load().await);
        assert_eq!(symbols(&view), vec!["FAST"]);

        source.release.notify_one();
        assert!(!slow.await.unwrap());
        assert_eq!(symbols(&view), vec!["FAST"]);
    }

    #[tokio::test]
    async fn unmount_suppresses_in_flight_response() {
        let source = Arc::new(GatedSource::default());
        let view = StockListView::new(source.clone());

        let pending = tokio::spawn({
            let view = view.clone();
            async move { view.load().await }
        });
        source.started.notified().await;

        view.unmount();
        source.release.notify_one();

        assert!(!pending.await.unwrap());
        assert!(view.state().is_pending());
        assert!(!view.load().await);
    }

    #[tokio::test]
    async fn subscribers_see_settled_state() {
        let view = StockListView::new(StubSource::new(vec![Ok(SAMPLE)]));
        let mut rx = view.subscribe();

        view.load().await;
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_ready());
    }

    #[tokio::test]
    async fn select_returns_card_when_ready() {
        let view = StockListView::new(StubSource::new(vec![Ok(SAMPLE)]));
        assert!(view.select("AAPL").is_none());

        view.load().await;
        let card = view.select("AAPL").unwrap();
        assert_eq!(card.name, "Apple");
        assert!(view.select("TSLA").is_none());
    }

    #[tokio::test]
    async fn polling_reloads_until_cancelled() {
        let source = StubSource::new(vec![Ok(SAMPLE)]);
        let view = StockListView::mount(source.clone()).await;

        let poller = view.start_polling(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(150)).await;
        poller.cancel().await;

        let after_cancel = source.calls();
        assert!(after_cancel >= 3, "expected polling loads, got {}", after_cancel);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(source.calls(), after_cancel);
        assert!(view.state().is_ready());
    }

    #[tokio::test]
    async fn unmount_stops_polling() {
        let source = StubSource::new(vec![Ok(SAMPLE)]);
        let view = StockListView::mount(source.clone()).await;
        let poller = view.start_polling(Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(50)).await;
        view.unmount();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(poller.is_finished());

        let calls = source.calls();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(source.calls(), calls);
    }

    #[tokio::test]
    async fn polling_an_unmounted_view_stops_at_once() {
        let source = StubSource::new(vec![Ok(SAMPLE)]);
        let view = StockListView::mount(source.clone()).await;
        view.unmount();

        let poller = view.start_polling(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(poller.is_finished());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn huge_interval_does_not_panic() {
        let view = StockListView::mount(StubSource::new(vec![Ok(SAMPLE)])).await;

        let poller = view.start_polling(Duration::MAX);
        assert!(poller.task.await.is_ok());

        let poller = view.start_polling(Duration::ZERO);
        assert!(poller.task.await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancel_waits_for_in_flight_load() {
        let source = Arc::new(GatedSource::default());
        let view = StockListView::new(source.clone());

        let poller = view.start_polling(Duration::from_millis(10));
        source.started.notified().await;
        poller.cancel().await;

        source.release.notify_one();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(view.state().is_pending());
    }

    #[tokio::test]
    async fn dropping_handle_stops_polling() {
        let source = StubSource::new(vec![Ok(SAMPLE)]);
        let view = StockListView::mount(source.clone()).await;

        drop(view.start_polling(Duration::from_millis(20)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(source.calls(), 1);
    }
}
