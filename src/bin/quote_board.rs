use quote_board::config::{parse_columns, parse_secs, Config};
use quote_board::sources::http::HttpQuoteSource;
use quote_board::view::render::DEFAULT_COLUMNS;
use quote_board::view::state::ViewState;
use quote_board::view::stock_list::StockListView;

use clap::{App, Arg};
use log::{error, info};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

// 与前端注释中的刷新周期保持一致
const DEFAULT_POLL_SECS: u64 = 60;

#[derive(Clone, Copy, PartialEq)]
enum Format {
    Text,
    Html,
}

fn print_view(view: &StockListView, format: Format, columns: usize, select: Option<&str>) {
    let rendered = view.render();
    match format {
        Format::Text => println!("{}", rendered.to_text(columns)),
        Format::Html => println!("{}", rendered.to_html()),
    }

    if let ViewState::Ready { fetched_at, .. } = view.state() {
        info!("Updated at {}", fetched_at.format("%Y-%m-%d %H:%M:%S"));
    }

    if let Some(symbol) = select {
        if let Some(card) = view.select(symbol) {
            println!();
            println!("{}  {}", card.symbol, card.name);
            println!("{:<8} {}", "price:", card.price);
            println!("{:<8} {}", "change:", card.percent_change);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logger
    env_logger::init();

    let matches = App::new("quote_board")
        .version("1.0.0")
        .about("Show the NASDAQ-100 quote snapshot as a card grid")
        .arg(
            Arg::with_name("base-url")
                .long("base-url")
                .value_name("URL")
                .help("Quote backend base URL (default: QUOTE_BOARD_BASE_URL or http://localhost:8000)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("path")
                .long("path")
                .value_name("PATH")
                .help("Snapshot endpoint path")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("timeout")
                .long("timeout")
                .value_name("SECS")
                .help("Request timeout in seconds (default: none)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("format")
                .long("format")
                .value_name("FORMAT")
                .help("Output format (text, html)")
                .takes_value(true)
                .possible_values(["text", "html"])
                .default_value("text"),
        )
        .arg(
            Arg::with_name("columns")
                .short('c')
                .long("columns")
                .value_name("N")
                .help("Cards per row in text output")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("select")
                .short('s')
                .long("select")
                .value_name("SYMBOL")
                .help("Show the detail card for one symbol")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("watch")
                .short('w')
                .long("watch")
                .help("Keep polling and reprint on every update until Ctrl-C")
                .takes_value(false),
        )
        .arg(
            Arg::with_name("interval")
                .short('i')
                .long("interval")
                .value_name("SECS")
                .help("Polling interval in seconds for --watch")
                .takes_value(true),
        )
        .get_matches();

    let mut config = Config::from_env()?;
    if let Some(url) = matches.value_of("base-url") {
        config = config.with_base_url(url);
    }
    if let Some(path) = matches.value_of("path") {
        config = config.with_endpoint_path(path);
    }
    if let Some(secs) = matches.value_of("timeout") {
        config = config.with_request_timeout(Some(parse_secs("--timeout", secs)?));
    }
    if let Some(secs) = matches.value_of("interval") {
        config = config.with_poll_interval(Some(parse_secs("--interval", secs)?));
    }

    let format = match matches.value_of("format") {
        Some("html") => Format::Html,
        _ => Format::Text,
    };
    let columns = match matches.value_of("columns") {
        Some(c) => parse_columns("--columns", c)?,
        None => DEFAULT_COLUMNS,
    };
    let select = matches.value_of("select");
    let watch = matches.is_present("watch") || config.poll_interval.is_some();

    info!("Loading quotes from {}", config.endpoint_url());
    let source = Arc::new(HttpQuoteSource::new(&config)?);
    let view = StockListView::mount(source).await;
    print_view(&view, format, columns, select);

    if !watch {
        if view.state().is_failed() {
            error!("Quote snapshot could not be loaded");
            std::process::exit(1);
        }
        return Ok(());
    }

    let interval = config
        .poll_interval
        .unwrap_or(Duration::from_secs(DEFAULT_POLL_SECS));
    let poller = view.start_polling(interval);
    let mut updates = view.subscribe();

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                print_view(&view, format, columns, select);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl-C, shutting down");
                break;
            }
        }
    }

    poller.cancel().await;
    view.unmount();

    Ok(())
}
