use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use blockscope::chain::{ChainStore, DemoProducer, SharedChain};
use blockscope::source::ChainSource;
use blockscope::table::LATEST_BLOCKS_MOUNT;
use blockscope::web_server::{AppState, routes};
use blockscope::{BlockPage, BlockTableController, TableConfig, TableMount};

/// Demo chain of `blocks` blocks plus an initialized table bound to it
async fn setup(blocks: u64) -> (Router, SharedChain) {
    let producer = DemoProducer::default();
    let mut store = ChainStore::new();
    for i in 0..blocks {
        producer.extend(&mut store, 1_672_583_400 + i as i64 * 2).unwrap();
    }
    let chain = store.shared();

    let mount = TableMount::new(LATEST_BLOCKS_MOUNT);
    let mut controller = BlockTableController::new(
        mount.clone(),
        Arc::new(ChainSource::new(chain.clone())),
        TableConfig::default(),
    );
    controller.initialize(false).await.unwrap();

    let state = AppState {
        chain: chain.clone(),
        latest_blocks: mount,
        refresh_interval_secs: 3,
    };
    (routes(state, false), chain)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_str(&body).unwrap())
}

#[tokio::test]
async fn latest_blocks_endpoint_serves_newest_eight() {
    let (app, _) = setup(20).await;

    let (status, body) = get(&app, "/data/lastestBlocks.data?draw=5&start=0&length=-1").await;
    assert_eq!(status, StatusCode::OK);

    let page: BlockPage = serde_json::from_str(&body).unwrap();
    assert_eq!(page.echo, 5);
    assert_eq!(page.data.len(), 8);
    assert_eq!(page.data[0].height, 20);
    assert_eq!(page.data[7].height, 13);

    let raw: Value = serde_json::from_str(&body).unwrap();
    assert!(raw["aaData"][0]["Status"].is_string());
    assert_eq!(raw["iTotalRecords"], 8);
}

#[tokio::test]
async fn pagination_endpoints_count_down_from_tip() {
    let (app, _) = setup(20).await;

    let (_, page) = get_json(&app, "/data/paginationBlocks.data?start=5&length=3").await;
    assert_eq!(page["iTotalRecords"], 20);
    let heights: Vec<u64> = page["aaData"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["Block Height"].as_u64().unwrap())
        .collect();
    assert_eq!(heights, [15, 14, 13]);

    let (_, bad) = get_json(&app, "/data/paginationBlocks.data?start=x&length=3").await;
    assert!(bad["aaData"].is_null());
}

#[tokio::test]
async fn chain_info_and_unknown_orders() {
    let (app, chain) = setup(10).await;

    let (_, info) = get_json(&app, "/data/currentChainInfo.data").await;
    assert_eq!(info["blocks"], 10);
    assert_eq!(info["maximumTps"], chain.read().await.maximum_tps());

    let (status, unknown) = get_json(&app, "/data/nothing.data").await;
    assert_eq!(status, StatusCode::OK);
    assert!(unknown.is_null());
}

#[tokio::test]
async fn block_detail_by_height_and_hash() {
    let (app, chain) = setup(5).await;
    let hash = chain.read().await.block(3).unwrap().hash.clone();

    let (status, html) = get(&app, "/blockDetail/?&height=3").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(&hash));

    let (status, html) = get(&app, &format!("/blockDetail/?hash={}", hash)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("<h1>Block 3</h1>"));

    let (_, json) = get_json(&app, "/api/block/3").await;
    assert_eq!(json["Hash"], hash.as_str());
}

#[tokio::test]
async fn block_detail_errors() {
    let (app, _) = setup(5).await;

    assert_eq!(get(&app, "/blockDetail/").await.0, StatusCode::BAD_REQUEST);
    assert_eq!(get(&app, "/blockDetail/?height=abc").await.0, StatusCode::BAD_REQUEST);
    assert_eq!(get(&app, "/blockDetail/?hash=deadbeef").await.0, StatusCode::NOT_FOUND);
    assert_eq!(get(&app, "/blockDetail?height=99").await.0, StatusCode::NOT_FOUND);
    assert_eq!(get(&app, "/transactionDetail?hash=deadbeef").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dashboard_hosts_the_latest_blocks_table() {
    let (app, chain) = setup(12).await;
    let tip_hash = chain.read().await.block(12).unwrap().hash.clone();

    let (status, html) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(r#"<table id="latest_blocks""#));
    assert!(html.contains(&format!(r#"href="/blockDetail/?hash={}""#, tip_hash)));
    assert!(html.contains(r#"content="3""#));
    assert!(!html.contains("{{"));
}

#[tokio::test]
async fn transaction_detail_is_served_for_indexed_transactions() {
    let (app, chain) = setup(30).await;
    let tx_hash = {
        let store = chain.read().await;
        store
            .latest_transactions()
            .first()
            .map(|tx| tx.tx_hash.clone())
            .expect("demo chain produces transactions")
    };

    let (status, html) = get(&app, &format!("/transactionDetail/?hash={}", tx_hash)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(&tx_hash));
}

#[tokio::test]
async fn data_orders_tolerate_malformed_draw() {
    let (app, _) = setup(10).await;

    let (status, page) = get_json(&app, "/data/lastestBlocks.data?draw=abc").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["sEcho"], 0);
    assert_eq!(page["aaData"].as_array().unwrap().len(), 8);

    let (status, info) = get_json(&app, "/data/currentChainInfo.data?draw=-").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["blocks"], 10);
}

#[tokio::test]
async fn blocks_page_lists_a_window_from_the_tip() {
    let (app, chain) = setup(30).await;
    let hash_25 = chain.read().await.block(25).unwrap().hash.clone();
    let hash_24 = chain.read().await.block(24).unwrap().hash.clone();

    let (status, html) = get(&app, "/blocks?start=5&length=1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("<th>Block Height</th>"));
    assert!(html.contains(r#"href="/blockDetail/?&amp;height=25""#));
    assert!(html.contains(&hash_25));
    assert!(!html.contains(&hash_24));
    assert!(html.contains(r#"href="/blocks?start=4&amp;length=1">Newer"#));
    assert!(html.contains(r#"href="/blocks?start=6&amp;length=1">Older"#));

    let (status, first) = get(&app, "/blocks?start=oops").await;
    assert_eq!(status, StatusCode::OK);
    assert!(first.contains(r#"href="/blockDetail/?&amp;height=30""#));
    assert!(!first.contains("Newer"));
}

#[tokio::test]
async fn transactions_page_links_each_transaction() {
    let (app, chain) = setup(30).await;
    let latest = chain.read().await.latest_transactions();
    let newest = latest.first().expect("demo chain produces transactions").clone();

    let (status, html) = get(&app, "/transactions?length=2").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(&format!(r#"href="/transactionDetail/?hash={}""#, newest.tx_hash)));
    assert!(html.contains(&format!(r#"href="/blockDetail/?hash={}""#, newest.block_hash)));
    assert_eq!(html.matches("<tr><td>").count(), latest.len().min(2));
}

#[tokio::test]
async fn block_detail_links_its_transactions() {
    let (app, chain) = setup(30).await;
    let tx = chain.read().await.latest_transactions().first().cloned().expect("demo chain produces transactions");
    let height = chain.read().await.height_of(&tx.block_hash).unwrap();

    let (status, html) = get(&app, &format!("/blockDetail/?height={}", height)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(&format!(r#"<a href="/transactionDetail/?hash={0}" title="{0}">{0}</a>"#, tx.tx_hash)));
}
