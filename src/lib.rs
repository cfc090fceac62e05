// 公开导出的模块，供外部使用
pub mod config;
pub mod errors;
pub mod models;
pub mod sources;
pub mod view;

#[doc(hidden)]
pub mod util;

// 重新导出常用类型，方便使用
pub use config::Config;
pub use errors::{QuoteBoardError, Result};
pub use models::quote::{QuoteRecord, QuoteSnapshot};
pub use sources::base::QuoteSource;
pub use sources::http::HttpQuoteSource;
pub use view::render::{Rendered, StockCard};
pub use view::state::{ViewState, LOAD_FAILED_MESSAGE};
pub use view::stock_list::{PollHandle, StockListView};
