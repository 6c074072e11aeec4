// File: src/table.rs
// Latest-blocks table: widget, mount point and the controller that drives them

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::data_models::{BlockRow, PageRequest};
use crate::render::{COLUMNS, Column, Markup, escape_html};
use crate::source::{LATEST_BLOCKS_ENDPOINT, TableSource};

/// Mount id of the latest-blocks table on the dashboard page
pub const LATEST_BLOCKS_MOUNT: &str = "latest_blocks";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("table controller used before initialize()")]
    NotInitialized,

    #[error("table controller is already initialized")]
    AlreadyInitialized,

    #[error("auto refresh needs a running Tokio runtime")]
    NoRuntime,
}

/// Widget options.
///
/// `endpoint`, `paging`, `page_length` and `refresh_interval` drive the
/// widget. The remaining flags describe the browser widget the mount stands
/// in for (processing indicator, search box, sortable headers, info line and
/// search debounce); they are carried for the page and logged on creation,
/// but this renderer draws none of that chrome.
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Data endpoint queried on every draw
    pub endpoint: String,
    /// Rows come from the endpoint, never from local filtering
    pub server_side: bool,
    pub processing: bool,
    pub paging: bool,
    /// Rows per page when paging is on
    pub page_length: u64,
    pub searching: bool,
    pub ordering: bool,
    pub info: bool,
    /// Search debounce; only meaningful with `searching`
    pub search_delay: Duration,
    pub refresh_interval: Duration,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            endpoint: LATEST_BLOCKS_ENDPOINT.to_string(),
            server_side: true,
            processing: true,
            paging: false,
            page_length: 10,
            searching: false,
            ordering: false,
            info: false,
            search_delay: Duration::from_millis(500),
            refresh_interval: Duration::from_millis(3000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    pub source: BlockRow,
    pub cells: Vec<Markup>,
}

/// What the mount point currently shows
#[derive(Debug, Clone, Default)]
pub struct RenderedTable {
    /// A widget is attached
    pub bound: bool,
    pub columns: Vec<&'static str>,
    pub rows: Vec<RenderedRow>,
    pub draw: u64,
    pub total_records: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl RenderedTable {
    pub fn to_html(&self, id: &str) -> String {
        let mut html = String::new();
        let _ = write!(
            html,
            r#"<table id="{}" class="table table-striped table-bordered table-hover"><thead><tr>"#,
            escape_html(id)
        );
        for column in &self.columns {
            let _ = write!(html, "<th>{}</th>", escape_html(column));
        }
        html.push_str("</tr></thead><tbody>");

        if self.rows.is_empty() {
            let _ = write!(
                html,
                r#"<tr><td colspan="{}" class="dataTables_empty">No data available in table</td></tr>"#,
                self.columns.len().max(1)
            );
        }
        for row in &self.rows {
            html.push_str("<tr>");
            for cell in &row.cells {
                let _ = write!(html, "<td>{}</td>", cell.to_html());
            }
            html.push_str("</tr>");
        }
        html.push_str("</tbody></table>");
        html
    }
}

/// Named surface a table widget renders into
#[derive(Debug, Clone)]
pub struct TableMount {
    id: Arc<str>,
    table: Arc<RwLock<RenderedTable>>,
}

impl TableMount {
    pub fn new(id: &str) -> Self {
        Self {
            id: Arc::from(id),
            table: Arc::new(RwLock::new(RenderedTable::default())),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn snapshot(&self) -> RenderedTable {
        self.table.read().await.clone()
    }

    pub async fn to_html(&self) -> String {
        self.table.read().await.to_html(&self.id)
    }
}

/// The table widget bound to one mount point
pub struct TableWidget {
    config: TableConfig,
    columns: [Column; 5],
    source: Arc<dyn TableSource>,
    mount: TableMount,
    next_draw: u64,
}

impl TableWidget {
    async fn bind(config: TableConfig, source: Arc<dyn TableSource>, mount: TableMount) -> Self {
        {
            let mut table = mount.table.write().await;
            table.bound = true;
            table.columns = COLUMNS.iter().map(|c| c.title()).collect();
        }
        Self {
            config,
            columns: COLUMNS,
            source,
            mount,
            next_draw: 0,
        }
    }

    fn next_request(&mut self) -> PageRequest {
        self.next_draw += 1;
        if self.config.paging {
            PageRequest {
                draw: self.next_draw,
                start: 0,
                length: i64::try_from(self.config.page_length).unwrap_or(i64::MAX),
            }
        } else {
            PageRequest::all(self.next_draw)
        }
    }

    /// Fetch the current page and render it into the mount.
    ///
    /// Fetch failures keep the rows already on screen; the error is only
    /// recorded. Responses echoing an older draw than the one requested are
    /// dropped.
    pub async fn draw(&mut self) {
        let request = self.next_request();

        let page = match self.source.fetch(request).await {
            Ok(page) => page,
            Err(e) => {
                warn!(mount = %self.mount.id(), draw = request.draw, error = %e, "table reload failed");
                self.mount.table.write().await.last_error = Some(e.to_string());
                return;
            }
        };

        if page.echo != 0 && page.echo < request.draw {
            debug!(mount = %self.mount.id(), echo = page.echo, draw = request.draw, "stale draw ignored");
            return;
        }

        let rows = page
            .data
            .into_iter()
            .enumerate()
            .map(|(index, row)| RenderedRow {
                cells: self.columns.iter().map(|c| c.render(index, &row)).collect(),
                source: row,
            })
            .collect::<Vec<_>>();

        let mut table = self.mount.table.write().await;
        debug!(mount = %self.mount.id(), draw = request.draw, rows = rows.len(), "table drawn");
        table.rows = rows;
        table.draw = request.draw;
        table.total_records = page.total_records;
        table.refreshed_at = Some(Utc::now());
        table.last_error = None;
    }
}

/// Stops the periodic refresh started by [`BlockTableController::initialize`].
///
/// Dropping the handle leaves the refresh running.
#[derive(Debug)]
pub struct RefreshHandle {
    task: JoinHandle<()>,
    period: Duration,
    ticks: Arc<AtomicU64>,
}

impl RefreshHandle {
    fn spawn(runtime: &tokio::runtime::Handle, widget: Arc<Mutex<TableWidget>>, period: Duration) -> Self {
        let ticks = Arc::new(AtomicU64::new(0));
        let counter = ticks.clone();
        let task = runtime.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                widget.lock().await.draw().await;
                counter.fetch_add(1, Ordering::Relaxed);
            }
        });
        Self { task, period, ticks }
    }

    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Reloads completed by the refresh cycle so far
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

/// Owns the latest-blocks table widget and its refresh cycle
pub struct BlockTableController {
    mount: TableMount,
    source: Arc<dyn TableSource>,
    config: TableConfig,
    widget: Option<Arc<Mutex<TableWidget>>>,
}

impl BlockTableController {
    pub fn new(mount: TableMount, source: Arc<dyn TableSource>, config: TableConfig) -> Self {
        Self {
            mount,
            source,
            config,
            widget: None,
        }
    }

    pub fn mount(&self) -> &TableMount {
        &self.mount
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.widget.is_some()
    }

    /// Create the widget, draw it once and, with `auto_refresh`, reload it
    /// every `refresh_interval`.
    pub async fn initialize(&mut self, auto_refresh: bool) -> Result<Option<RefreshHandle>, ControllerError> {
        if self.widget.is_some() {
            return Err(ControllerError::AlreadyInitialized);
        }
        let runtime = if auto_refresh {
            Some(tokio::runtime::Handle::try_current().map_err(|_| ControllerError::NoRuntime)?)
        } else {
            None
        };

        info!(
            mount = %self.mount.id(),
            source = %self.source.describe(),
            server_side = self.config.server_side,
            processing = self.config.processing,
            searching = self.config.searching,
            ordering = self.config.ordering,
            info = self.config.info,
            search_delay_ms = self.config.search_delay.as_millis() as u64,
            auto_refresh,
            "table widget created"
        );

        let widget = TableWidget::bind(self.config.clone(), self.source.clone(), self.mount.clone()).await;
        let widget = Arc::new(Mutex::new(widget));
        self.widget = Some(widget.clone());

        widget.lock().await.draw().await;

        Ok(runtime.map(|rt| RefreshHandle::spawn(&rt, widget, self.config.refresh_interval)))
    }

    /// Re-fetch the current page and re-render in place
    pub async fn reload(&self) -> Result<(), ControllerError> {
        let widget = self.widget.as_ref().ok_or(ControllerError::NotInitialized)?;
        widget.lock().await.draw().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::BlockPage;
    use crate::source::SourceError;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct FixedSource {
        calls: AtomicUsize,
        echo: Option<u64>,
    }

    #[async_trait]
    impl TableSource for FixedSource {
        async fn fetch(&self, request: PageRequest) -> Result<BlockPage, SourceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as u64;
            let row = BlockRow {
                height: 100 + call,
                hash: format!("h{}", call),
                time: "2023-01-01 14:30:00".to_string(),
                status: 1,
                tx_count: 0,
            };
            Ok(BlockPage::new(vec![row], 1, self.echo.unwrap_or(request.draw)))
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    fn controller(echo: Option<u64>) -> BlockTableController {
        let source = Arc::new(FixedSource { calls: AtomicUsize::new(0), echo });
        BlockTableController::new(TableMount::new(LATEST_BLOCKS_MOUNT), source, TableConfig::default())
    }

    #[test]
    fn default_config_matches_dashboard_widget() {
        let config = TableConfig::default();
        assert_eq!(config.endpoint, "/data/lastestBlocks.data");
        assert!(config.server_side);
        assert!(!config.paging && !config.searching && !config.ordering && !config.info);
        assert_eq!(config.search_delay, Duration::from_millis(500));
        assert_eq!(config.refresh_interval, Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn initialize_draws_columns_and_rows() {
        let mut c = controller(None);
        let handle = c.initialize(false).await.unwrap();
        assert!(handle.is_none());

        let table = c.mount().snapshot().await;
        assert!(table.bound);
        assert_eq!(table.columns, ["Block Height", "Block Hash", "Time", "Status", "Txs"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].cells[2].text(), "14:30:00");
        assert_eq!(table.draw, 1);
    }

    #[tokio::test]
    async fn reload_before_initialize_fails() {
        let c = controller(None);
        assert_eq!(c.reload().await, Err(ControllerError::NotInitialized));
    }

    #[tokio::test]
    async fn second_initialize_fails() {
        let mut c = controller(None);
        c.initialize(false).await.unwrap();
        assert_eq!(c.initialize(false).await.err(), Some(ControllerError::AlreadyInitialized));
        assert_eq!(c.mount().snapshot().await.draw, 1);
    }

    #[tokio::test]
    async fn stale_echo_is_ignored() {
        let mut c = controller(Some(1));
        c.initialize(false).await.unwrap();
        c.reload().await.unwrap();

        let table = c.mount().snapshot().await;
        assert_eq!(table.draw, 1);
        assert_eq!(table.rows[0].source.height, 100);
    }

    #[test]
    fn empty_table_html_has_placeholder_row() {
        let table = RenderedTable {
            columns: COLUMNS.iter().map(|c| c.title()).collect(),
            ..Default::default()
        };
        let html = table.to_html("latest_blocks");
        assert!(html.starts_with(r#"<table id="latest_blocks""#));
        assert!(html.contains(r#"colspan="5""#));
        assert!(html.contains("<th>Block Hash</th>"));
    }
}
