// File: src/render.rs
// Column contract and per-column cell rendering for the latest-blocks table

use std::fmt;

use crate::data_models::BlockRow;
use crate::status;

/// Route of the block detail page
pub const BLOCK_DETAIL_PATH: &str = "/blockDetail/";

/// Route of the transaction detail page
pub const TRANSACTION_DETAIL_PATH: &str = "/transactionDetail/";

/// Raw value of one cell, before rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellValue<'a> {
    Unsigned(u64),
    Signed(i64),
    Text(&'a str),
}

impl fmt::Display for CellValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Unsigned(n) => write!(f, "{}", n),
            CellValue::Signed(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// Rendered cell content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    /// Plain, unstyled text
    Text(String),
    /// Hyperlink to another page
    Link {
        href: String,
        title: String,
        text: String,
        new_tab: bool,
    },
    /// Text with a hover title
    Span { title: String, text: String },
    /// Styled status label
    Badge {
        title: &'static str,
        class: &'static str,
    },
}

impl Markup {
    /// Visible text of the cell
    pub fn text(&self) -> &str {
        match self {
            Markup::Text(text) => text.as_str(),
            Markup::Link { text, .. } => text.as_str(),
            Markup::Span { text, .. } => text.as_str(),
            Markup::Badge { title, .. } => title,
        }
    }

    /// Hover title, when the cell has one
    pub fn title(&self) -> Option<&str> {
        match self {
            Markup::Link { title, .. } | Markup::Span { title, .. } => Some(title.as_str()),
            Markup::Text(_) | Markup::Badge { .. } => None,
        }
    }

    pub fn to_html(&self) -> String {
        match self {
            Markup::Text(text) => escape_html(text),
            Markup::Link { href, title, text, new_tab } => format!(
                r#"<a href="{}" title="{}"{}>{}</a>"#,
                escape_html(href),
                escape_html(title),
                if *new_tab { r#" target="_BLANK""# } else { "" },
                escape_html(text),
            ),
            Markup::Span { title, text } => format!(
                r#"<span title="{}">{}</span>"#,
                escape_html(title),
                escape_html(text),
            ),
            Markup::Badge { title, class } => format!(
                r#"<span class="m-badge m-badge--{} m-badge--wide">{}</span>"#,
                class, title,
            ),
        }
    }
}

/// Typed cell renderer: `(cell value, row index, full row) -> markup`
pub type ColumnRenderer = fn(&CellValue<'_>, usize, &BlockRow) -> Markup;

/// Columns of the latest-blocks table, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Height,
    Hash,
    Time,
    Status,
    Txs,
}

pub const COLUMNS: [Column; 5] = [
    Column::Height,
    Column::Hash,
    Column::Time,
    Column::Status,
    Column::Txs,
];

impl Column {
    /// Header text, also the key of the field in the data endpoint payload
    pub fn title(self) -> &'static str {
        match self {
            Column::Height => "Block Height",
            Column::Hash => "Block Hash",
            Column::Time => "Time",
            Column::Status => "Status",
            Column::Txs => "Txs",
        }
    }

    pub fn renderer(self) -> ColumnRenderer {
        match self {
            Column::Height => render_height,
            Column::Hash => render_hash,
            Column::Time => render_time,
            Column::Status => render_status,
            Column::Txs => render_verbatim,
        }
    }

    pub fn cell(self, row: &BlockRow) -> CellValue<'_> {
        match self {
            Column::Height => CellValue::Unsigned(row.height),
            Column::Hash => CellValue::Text(&row.hash),
            Column::Time => CellValue::Text(&row.time),
            Column::Status => CellValue::Signed(row.status),
            Column::Txs => CellValue::Unsigned(row.tx_count),
        }
    }

    pub fn render(self, index: usize, row: &BlockRow) -> Markup {
        (self.renderer())(&self.cell(row), index, row)
    }
}

/// Render every column of `row`
pub fn render_row(index: usize, row: &BlockRow) -> Vec<Markup> {
    COLUMNS.iter().map(|column| column.render(index, row)).collect()
}

/// Link to the detail page by height, titled with the row hash
pub fn render_height(cell: &CellValue<'_>, _index: usize, row: &BlockRow) -> Markup {
    Markup::Link {
        href: format!("{}?&height={}", BLOCK_DETAIL_PATH, cell),
        title: row.hash.clone(),
        text: cell.to_string(),
        new_tab: true,
    }
}

/// Link to the detail page by hash
pub fn render_hash(cell: &CellValue<'_>, _index: usize, _row: &BlockRow) -> Markup {
    let hash = cell.to_string();
    Markup::Link {
        href: format!("{}?hash={}", BLOCK_DETAIL_PATH, hash),
        title: hash.clone(),
        text: hash,
        new_tab: true,
    }
}

/// Link to the transaction detail page
pub fn transaction_link(hash: &str) -> Markup {
    Markup::Link {
        href: format!("{}?hash={}", TRANSACTION_DETAIL_PATH, hash),
        title: hash.to_string(),
        text: hash.to_string(),
        new_tab: false,
    }
}

/// Show only the time part of `"<date> <time>"`, full value on hover
pub fn render_time(cell: &CellValue<'_>, _index: usize, _row: &BlockRow) -> Markup {
    let full = cell.to_string();
    let text = match full.split(' ').nth(1) {
        Some(time) => time.to_string(),
        None => full.clone(),
    };
    Markup::Span { title: full, text }
}

/// Badge for known status codes, the raw code otherwise
pub fn render_status(cell: &CellValue<'_>, _index: usize, row: &BlockRow) -> Markup {
    match status::describe(row.status) {
        Some(descriptor) => Markup::Badge {
            title: descriptor.title,
            class: descriptor.badge_class,
        },
        None => Markup::Text(cell.to_string()),
    }
}

pub fn render_verbatim(cell: &CellValue<'_>, _index: usize, _row: &BlockRow) -> Markup {
    Markup::Text(cell.to_string())
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(height: u64, hash: &str, time: &str, status: i64) -> BlockRow {
        BlockRow {
            height,
            hash: hash.to_string(),
            time: time.to_string(),
            status,
            tx_count: 4,
        }
    }

    #[test]
    fn height_links_to_detail_by_height() {
        let r = row(12345, "abc123", "2023-01-01 14:30:00", 1);
        let markup = Column::Height.render(0, &r);

        assert_eq!(
            markup,
            Markup::Link {
                href: "/blockDetail/?&height=12345".to_string(),
                title: "abc123".to_string(),
                text: "12345".to_string(),
                new_tab: true,
            }
        );
        assert_eq!(
            markup.to_html(),
            r#"<a href="/blockDetail/?&amp;height=12345" title="abc123" target="_BLANK">12345</a>"#
        );
    }

    #[test]
    fn hash_links_to_detail_by_hash() {
        let r = row(1, "abc123", "2023-01-01 14:30:00", 1);
        let markup = Column::Hash.render(0, &r);

        assert_eq!(markup.text(), "abc123");
        assert_eq!(markup.title(), Some("abc123"));
        match markup {
            Markup::Link { href, .. } => assert_eq!(href, "/blockDetail/?hash=abc123"),
            other => panic!("expected link, got {:?}", other),
        }
    }

    #[test]
    fn time_shows_time_segment_with_full_title() {
        let r = row(1, "h", "2023-01-01 14:30:00", 1);
        let markup = Column::Time.render(0, &r);

        assert_eq!(markup.text(), "14:30:00");
        assert_eq!(markup.title(), Some("2023-01-01 14:30:00"));
        assert_eq!(
            markup.to_html(),
            r#"<span title="2023-01-01 14:30:00">14:30:00</span>"#
        );
    }

    #[test]
    fn time_without_space_is_unchanged() {
        let r = row(1, "h", "2023-01-01", 1);
        let markup = Column::Time.render(0, &r);

        assert_eq!(markup.text(), "2023-01-01");
        assert_eq!(markup.title(), Some("2023-01-01"));
    }

    #[test]
    fn status_renders_badges_for_known_codes() {
        for (code, descriptor) in (1..=7).zip(status::STATUS_DESCRIPTORS.iter()) {
            let markup = Column::Status.render(0, &row(1, "h", "t", code));
            assert_eq!(
                markup,
                Markup::Badge { title: descriptor.title, class: descriptor.badge_class }
            );
        }

        let success = Column::Status.render(0, &row(1, "h", "t", 1));
        assert_eq!(
            success.to_html(),
            r#"<span class="m-badge m-badge--success m-badge--wide">Success</span>"#
        );
    }

    #[test]
    fn status_renders_raw_code_when_unknown() {
        for code in [0, 8, -1] {
            let markup = Column::Status.render(0, &row(1, "h", "t", code));
            assert_eq!(markup, Markup::Text(code.to_string()));
        }
    }

    #[test]
    fn txs_are_verbatim() {
        let markup = Column::Txs.render(0, &row(1, "h", "t", 1));
        assert_eq!(markup, Markup::Text("4".to_string()));
    }

    #[test]
    fn row_renders_columns_in_contract_order() {
        let cells = render_row(0, &row(9, "ff", "2023-01-01 00:00:01", 2));
        let texts: Vec<&str> = cells.iter().map(Markup::text).collect();
        assert_eq!(texts, ["9", "ff", "00:00:01", "Pending", "4"]);
    }

    #[test]
    fn transaction_link_targets_detail_page() {
        assert_eq!(
            transaction_link("t1").to_html(),
            r#"<a href="/transactionDetail/?hash=t1" title="t1">t1</a>"#
        );
    }

    #[test]
    fn html_is_escaped() {
        let r = row(1, "<b>\"x\"", "t", 1);
        let html = Column::Hash.render(0, &r).to_html();
        assert!(!html.contains("<b>"));
        assert!(html.contains("&lt;b&gt;&quot;x&quot;"));
    }
}
