use crate::models::quote::QuoteRecord;
use crate::util::escape_html;
use crate::view::state::ViewState;
use std::fmt;

/// Placeholder shown until the first load settles.
pub const LOADING_TEXT: &str = "loading...";

pub const DEFAULT_COLUMNS: usize = 4;
const CARD_WIDTH: usize = 28;

/// One rendered card, every field already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockCard {
    pub symbol: String,
    pub name: String,
    pub price: String,
    pub percent_change: String,
}

impl From<&QuoteRecord> for StockCard {
    fn from(quote: &QuoteRecord) -> Self {
        Self {
            symbol: quote.symbol.clone(),
            name: quote.display_name().to_string(),
            price: quote.display_price(),
            percent_change: quote.display_percent_change(),
        }
    }
}

/// Render tree for the stock list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Loading,
    Message(String),
    Cards(Vec<StockCard>),
}

impl Rendered {
    /// Render a state. Ready snapshots are sorted here, on every call.
    pub fn from_state(state: &ViewState) -> Self {
        match state {
            ViewState::Pending => Rendered::Loading,
            ViewState::Failed(message) => Rendered::Message(message.clone()),
            ViewState::Ready { snapshot, .. } => {
                Rendered::Cards(snapshot.sorted().into_iter().map(StockCard::from).collect())
            }
        }
    }

    pub fn cards(&self) -> &[StockCard] {
        match self {
            Rendered::Cards(cards) => cards,
            _ => &[],
        }
    }

    /// Plain-text grid, `columns` cards per row.
    pub fn to_text(&self, columns: usize) -> String {
        let cards = match self {
            Rendered::Loading => return LOADING_TEXT.to_string(),
            Rendered::Message(message) => return message.clone(),
            Rendered::Cards(cards) => cards,
        };

        let mut rows = Vec::new();
        for row in cards.chunks(columns.max(1)) {
            let header: Vec<String> = row
                .iter()
                .map(|c| fit(&format!("{} {}", c.symbol, c.name), CARD_WIDTH))
                .collect();
            let body: Vec<String> = row
                .iter()
                .map(|c| fit(&format!("{} {}", c.price, c.percent_change), CARD_WIDTH))
                .collect();

            rows.push(format!(
                "{}\n{}",
                header.join("  ").trim_end(),
                body.join("  ").trim_end()
            ));
        }

        rows.join("\n\n")
    }

    /// HTML markup using the `stock-grid` / `stock-card` class layout.
    pub fn to_html(&self) -> String {
        let cards = match self {
            Rendered::Loading => return format!("<div>{}</div>", LOADING_TEXT),
            Rendered::Message(message) => return format!("<div>{}</div>", escape_html(message)),
            Rendered::Cards(cards) => cards,
        };

        let mut html = String::from("<div class=\"stock-grid\">\n");
        for card in cards {
            let symbol = escape_html(&card.symbol);
            html.push_str(&format!("  <div class=\"stock-card\" data-symbol=\"{}\">\n", symbol));
            html.push_str(&format!(
                "    <div class=\"stock-header\"><span class=\"stock-symbol\">{}</span><span class=\"stock-name\">{}</span></div>\n",
                symbol,
                escape_html(&card.name)
            ));
            html.push_str(&format!(
                "    <div class=\"stock-body\"><span class=\"stock-price\">{}</span><span>{}</span></div>\n",
                escape_html(&card.price),
                escape_html(&card.percent_change)
            ));
            html.push_str("  </div>\n");
        }
        html.push_str("</div>");
        html
    }
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text(DEFAULT_COLUMNS))
    }
}

// 截断并右侧补空格到固定宽度
fn fit(s: &str, width: usize) -> String {
    let count = s.chars().count();
    if count > width {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    } else {
        format!("{}{}", s, " ".repeat(width - count))
    }
}
