// File: src/web_server.rs
// Explorer web server: dashboard page, data endpoints, list and detail pages

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::chain::{ChainStore, DemoProducer, SharedChain, format_time};
use crate::data_models::{AppConfig, BlockDetail, TransactionDetail};
use crate::render::{self, BLOCK_DETAIL_PATH, COLUMNS, Markup, escape_html};
use crate::source::ChainSource;
use crate::table::{BlockTableController, LATEST_BLOCKS_MOUNT, TableConfig, TableMount};

/// Rows per page on the block and transaction list pages
const LIST_PAGE_LENGTH: u64 = 20;

/// Paging query of the DataTables server-side protocol.
///
/// Every field is taken as text; unparsable values fall back instead of
/// rejecting the request.
#[derive(Debug, Default, Deserialize)]
struct PagingQuery {
    draw: Option<String>,
    start: Option<String>,
    length: Option<String>,
}

impl PagingQuery {
    fn draw(&self) -> u64 {
        self.draw.as_deref().and_then(|d| d.parse().ok()).unwrap_or(0)
    }
}

/// Detail page lookup
#[derive(Debug, Default, Deserialize)]
struct DetailQuery {
    height: Option<String>,
    hash: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExplorerError {
    #[error("Not enough parameter")]
    NotEnoughParameter,
    #[error("Invalid height format")]
    InvalidHeightFormat,
    #[error("This hash is not a block hash")]
    NotBlockHash,
    #[error("This hash is not a transaction hash")]
    NotTransactionHash,
    #[error("Block {0} not found")]
    BlockNotFound(u64),
}

impl IntoResponse for ExplorerError {
    fn into_response(self) -> Response {
        let status = match self {
            ExplorerError::NotEnoughParameter | ExplorerError::InvalidHeightFormat => StatusCode::BAD_REQUEST,
            ExplorerError::NotBlockHash
            | ExplorerError::NotTransactionHash
            | ExplorerError::BlockNotFound(_) => StatusCode::NOT_FOUND,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub chain: SharedChain,
    pub latest_blocks: TableMount,
    pub refresh_interval_secs: u64,
}

/// Build the explorer routes
pub fn routes(state: AppState, enable_cors: bool) -> Router {
    let mut app = Router::new()
        .route("/", get(dashboard_html))
        .route("/data/:order", any(data_handler))
        .route("/blocks", get(blocks_html))
        .route("/transactions", get(transactions_html))
        .route("/blockDetail", get(block_detail_html))
        .route("/blockDetail/", get(block_detail_html))
        .route("/transactionDetail", get(transaction_detail_html))
        .route("/transactionDetail/", get(transaction_detail_html))
        .route("/api/block/:height", get(get_block_detail))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // Add CORS if enabled
    if enable_cors {
        app = app.layer(
            ServiceBuilder::new().layer(
                CorsLayer::new()
                    .allow_origin(tower_http::cors::Any)
                    .allow_methods(tower_http::cors::Any)
                    .allow_headers(tower_http::cors::Any),
            ),
        );
    }
    app
}

/// Run the explorer over a demo chain, with the latest-blocks table auto-refreshing
pub async fn run_web_mode(config: &AppConfig) -> Result<()> {
    let producer = DemoProducer::default();
    let mut store = ChainStore::new();
    producer.seed(&mut store, config.seed_blocks, config.block_interval)?;
    let chain = store.shared();
    let _producer_task = producer.spawn(chain.clone(), config.block_interval);

    let mount = TableMount::new(LATEST_BLOCKS_MOUNT);
    let table_config = TableConfig {
        refresh_interval: config.refresh_interval,
        ..TableConfig::default()
    };
    let mut controller = BlockTableController::new(
        mount.clone(),
        Arc::new(ChainSource::new(chain.clone())),
        table_config,
    );
    let _refresh = controller.initialize(true).await?;

    let state = AppState {
        chain,
        latest_blocks: mount,
        refresh_interval_secs: config.refresh_interval.as_secs().max(1),
    };
    let app = routes(state, config.cors);

    println!("🌐 Explorer available at: http://{}", config.listen);
    println!("📊 Data endpoints:");
    println!("   GET /data/lastestBlocks.data - Latest blocks table");
    println!("   GET /data/paginationBlocks.data?start=X&length=Y - Block pages");
    println!("   GET /blocks?start=X&length=Y - Block list");
    println!("   GET /transactions?start=X&length=Y - Transaction list");
    println!("   GET /blockDetail/?height=N | ?hash=H - Block details");
    info!(listen = %config.listen, "explorer listening");

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Serve the dashboard page with the latest-blocks table rendered in place
async fn dashboard_html(State(state): State<AppState>) -> Html<String> {
    let table = state.latest_blocks.to_html().await;
    let maximum_tps = state.chain.read().await.maximum_tps();
    Html(
        include_str!("dashboard.html")
            .replace("{{REFRESH_SECS}}", &state.refresh_interval_secs.to_string())
            .replace("{{MAXIMUM_TPS}}", &maximum_tps.to_string())
            .replace("{{LATEST_BLOCKS}}", &table),
    )
}

/// `/data/:order` dispatch; unknown orders answer `null`
async fn data_handler(
    Path(order): Path<String>,
    Query(query): Query<PagingQuery>,
    State(state): State<AppState>,
) -> Json<Value> {
    let chain = state.chain.read().await;
    let draw = query.draw();
    let result = match order.as_str() {
        "lastestBlocks.data" => serde_json::to_value(chain.latest_blocks(draw)),
        "paginationBlocks.data" => match paging(&query) {
            Some((start, length)) => serde_json::to_value(chain.paginate_blocks(start, length, draw)),
            None => Ok(empty_page()),
        },
        "lastestTransactions.data" => serde_json::to_value(chain.latest_transactions()),
        "paginationTxs.data" => match paging(&query) {
            Some((start, length)) => {
                serde_json::to_value(chain.paginate_transactions(start, length, draw))
            }
            None => Ok(empty_page()),
        },
        "transactions.data" => serde_json::to_value(chain.transaction_counts()),
        "currentChainInfo.data" => serde_json::to_value(chain.chain_info()),
        other => {
            warn!(order = other, "unknown data order");
            Ok(Value::Null)
        }
    };

    Json(result.unwrap_or_else(|e| {
        warn!(error = %e, "failed to encode data response");
        Value::Null
    }))
}

/// `start` and `length` must both be present and numeric
fn paging(query: &PagingQuery) -> Option<(u64, u64)> {
    let start = query.start.as_deref()?.parse().ok()?;
    let length = query.length.as_deref()?.parse().ok()?;
    Some((start, length))
}

/// Window of a list page; missing or bad values fall back to the first page
fn list_window(query: &PagingQuery) -> (u64, u64) {
    let start = query.start.as_deref().and_then(|s| s.parse().ok()).unwrap_or(0);
    let length = query
        .length
        .as_deref()
        .and_then(|l| l.parse().ok())
        .filter(|l| *l > 0)
        .unwrap_or(LIST_PAGE_LENGTH);
    (start, length)
}

fn empty_page() -> Value {
    serde_json::json!({
        "iTotalRecords": 0,
        "iTotalDisplayRecords": 0,
        "sEcho": 0,
        "sColumns": "",
        "aaData": null,
    })
}

/// Resolve a detail query to a block height; height wins over hash
fn resolve_height(query: &DetailQuery, chain: &ChainStore) -> Result<u64, ExplorerError> {
    match query.height.as_deref().filter(|h| !h.is_empty()) {
        Some(height) => height.parse().map_err(|_| ExplorerError::InvalidHeightFormat),
        None => {
            let hash = query
                .hash
                .as_deref()
                .filter(|h| !h.is_empty())
                .ok_or(ExplorerError::NotEnoughParameter)?;
            chain.height_of(hash).ok_or(ExplorerError::NotBlockHash)
        }
    }
}

fn lookup_block(query: &DetailQuery, chain: &ChainStore) -> Result<BlockDetail, ExplorerError> {
    let height = resolve_height(query, chain)?;
    chain.block_detail(height).ok_or(ExplorerError::BlockNotFound(height))
}

async fn block_detail_html(
    Query(query): Query<DetailQuery>,
    State(state): State<AppState>,
) -> Result<Html<String>, ExplorerError> {
    let detail = lookup_block(&query, &*state.chain.read().await)?;

    let mut fields = vec![
        ("Height", Markup::Text(detail.height.to_string())),
        ("Hash", Markup::Text(detail.hash.clone())),
        ("HashPrevBlock", Markup::Text(detail.prev_hash.clone())),
        ("ChainCoord", Markup::Text(detail.chain_coord.clone())),
        ("Version", Markup::Text(detail.version.to_string())),
        ("Timestamp", Markup::Text(detail.timestamp.clone())),
        ("FormulationAddress", Markup::Text(detail.formulator.clone())),
        ("TimeoutCount", Markup::Text(detail.timeout_count.to_string())),
        ("Transaction Count", Markup::Text(detail.transaction_count.to_string())),
    ];
    for tx in &detail.transactions {
        fields.push(("Transaction", render::transaction_link(tx)));
    }
    Ok(Html(detail_page(&format!("Block {}", detail.height), &fields)))
}

async fn transaction_detail_html(
    Query(query): Query<DetailQuery>,
    State(state): State<AppState>,
) -> Result<Html<String>, ExplorerError> {
    let hash = query
        .hash
        .as_deref()
        .filter(|h| !h.is_empty())
        .ok_or(ExplorerError::NotEnoughParameter)?;
    let detail: TransactionDetail = state
        .chain
        .read()
        .await
        .transaction_detail(hash)
        .ok_or(ExplorerError::NotTransactionHash)?;

    let fields = [
        ("Type", Markup::Text(detail.tx_type.clone())),
        ("Tx Hash", Markup::Text(detail.tx_hash.clone())),
        ("Tx TimeStamp", Markup::Text(detail.tx_timestamp.clone())),
        ("Block Height", Markup::Text(detail.block_height.to_string())),
        ("Block Hash", block_link(&detail.block_hash)),
        ("Block Timestamp", Markup::Text(detail.block_timestamp.clone())),
    ];
    Ok(Html(detail_page("Transaction", &fields)))
}

/// Get block details via REST API
async fn get_block_detail(
    Path(height): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<BlockDetail>, ExplorerError> {
    state
        .chain
        .read()
        .await
        .block_detail(height)
        .map(Json)
        .ok_or(ExplorerError::BlockNotFound(height))
}

/// Paged block list, newest first
async fn blocks_html(Query(query): Query<PagingQuery>, State(state): State<AppState>) -> Html<String> {
    let (start, length) = list_window(&query);
    let page = state.chain.read().await.paginate_blocks(start, length, 0);

    let rows: Vec<Vec<Markup>> = page
        .data
        .iter()
        .enumerate()
        .map(|(index, row)| render::render_row(index, row))
        .collect();
    let columns: Vec<&str> = COLUMNS.iter().map(|c| c.title()).collect();
    Html(list_page("Blocks", "/blocks", &columns, &rows, start, length, page.total_records))
}

/// Paged list of the latest transactions
async fn transactions_html(Query(query): Query<PagingQuery>, State(state): State<AppState>) -> Html<String> {
    let (start, length) = list_window(&query);
    let page = state.chain.read().await.paginate_transactions(start, length, 0);

    let rows: Vec<Vec<Markup>> = page
        .data
        .iter()
        .map(|tx| {
            vec![
                render::transaction_link(&tx.tx_hash),
                block_link(&tx.block_hash),
                Markup::Text(tx.chain_id.clone()),
                Markup::Text(format_time(tx.time)),
                Markup::Text(tx.tx_type.clone()),
            ]
        })
        .collect();
    let columns = ["Tx Hash", "Block Hash", "Chain", "Time", "Type"];
    Html(list_page("Transactions", "/transactions", &columns, &rows, start, length, page.total_records))
}

fn block_link(hash: &str) -> Markup {
    Markup::Link {
        href: format!("{}?hash={}", BLOCK_DETAIL_PATH, hash),
        title: hash.to_string(),
        text: hash.to_string(),
        new_tab: false,
    }
}

fn page_shell(heading: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{0}</title></head>\
         <body><h1>{0}</h1>{1}<p><a href=\"/\">Back</a></p></body></html>",
        escape_html(heading),
        body
    )
}

fn list_page(
    heading: &str,
    route: &str,
    columns: &[&str],
    rows: &[Vec<Markup>],
    start: u64,
    length: u64,
    total: u64,
) -> String {
    let head: String = columns.iter().map(|c| format!("<th>{}</th>", escape_html(c))).collect();
    let body: String = rows
        .iter()
        .map(|cells| {
            let tds: String = cells.iter().map(|c| format!("<td>{}</td>", c.to_html())).collect();
            format!("<tr>{}</tr>", tds)
        })
        .collect();

    let mut nav = Vec::new();
    if start > 0 {
        nav.push(format!(
            r#"<a href="{}?start={}&amp;length={}">Newer</a>"#,
            route,
            start.saturating_sub(length),
            length
        ));
    }
    if start.saturating_add(length) < total {
        nav.push(format!(
            r#"<a href="{}?start={}&amp;length={}">Older</a>"#,
            route,
            start + length,
            length
        ));
    }

    page_shell(
        heading,
        &format!(
            r#"<p class="stats">{} total</p><table class="list"><thead><tr>{}</tr></thead><tbody>{}</tbody></table><p class="nav">{}</p>"#,
            total,
            head,
            body,
            nav.join(" ")
        ),
    )
}

fn detail_page(heading: &str, fields: &[(&str, Markup)]) -> String {
    let rows: String = fields
        .iter()
        .map(|(name, value)| format!("<tr><th>{}</th><td>{}</td></tr>", escape_html(name), value.to_html()))
        .collect();
    page_shell(heading, &format!("<table class=\"detail\">{}</table>", rows))
}
