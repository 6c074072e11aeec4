// File: src/cli_interface.rs
// One-shot latest-blocks table printed to the terminal

use std::sync::Arc;

use anyhow::Result;

use crate::data_models::AppConfig;
use crate::source::HttpSource;
use crate::table::{BlockTableController, LATEST_BLOCKS_MOUNT, RenderedTable, TableConfig, TableMount};

/// Fetch the latest blocks once from a running explorer and print them
pub async fn run_blocks_mode(config: &AppConfig) -> Result<()> {
    let table_config = TableConfig::default();
    let source = HttpSource::with_timeout(&config.explorer_url, &table_config.endpoint, config.refresh_interval)?;
    let mut controller = BlockTableController::new(
        TableMount::new(LATEST_BLOCKS_MOUNT),
        Arc::new(source),
        table_config,
    );

    // No refresh cycle for a single printout
    controller.initialize(false).await?;
    let table = controller.mount().snapshot().await;

    if let Some(error) = &table.last_error {
        anyhow::bail!("Could not load latest blocks from {}: {}", config.explorer_url, error);
    }
    if table.rows.is_empty() {
        println!("No blocks found.");
        return Ok(());
    }

    print_blocks_table(&table);
    print_status_summary(&table);
    Ok(())
}

/// Print blocks in a formatted table
fn print_blocks_table(table: &RenderedTable) {
    println!();
    print_table_header();
    print_table_separator();

    for row in &table.rows {
        let [height, hash, time, status, txs] = &row.cells[..] else {
            continue;
        };
        println!(
            "│ {:>12} │ {:<64} │ {:<8} │ {:<10} │ {:>5} │",
            height.text(),
            truncate_hash(hash.text(), 64),
            time.text(),
            status.text(),
            txs.text()
        );
    }

    print_table_footer();
}

/// Print table header
fn print_table_header() {
    println!("╭─{:─<12}─┬─{:─<64}─┬─{:─<8}─┬─{:─<10}─┬─{:─<5}─╮", "", "", "", "", "");
    println!(
        "│ {:^12} │ {:^64} │ {:^8} │ {:^10} │ {:^5} │",
        "Block Height", "Block Hash", "Time", "Status", "Txs"
    );
}

/// Print table separator
fn print_table_separator() {
    println!("├─{:─<12}─┼─{:─<64}─┼─{:─<8}─┼─{:─<10}─┼─{:─<5}─┤", "", "", "", "", "");
}

/// Print table footer
fn print_table_footer() {
    println!("╰─{:─<12}─┴─{:─<64}─┴─{:─<8}─┴─{:─<10}─┴─{:─<5}─╯", "", "", "", "", "");
}

/// Count rows per rendered status label
fn status_counts(table: &RenderedTable) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for row in &table.rows {
        let Some(status) = row.cells.get(3) else {
            continue;
        };
        match counts.iter_mut().find(|(label, _)| label == status.text()) {
            Some((_, count)) => *count += 1,
            None => counts.push((status.text().to_string(), 1)),
        }
    }
    counts
}

fn print_status_summary(table: &RenderedTable) {
    let summary: Vec<String> = status_counts(table)
        .into_iter()
        .map(|(label, count)| format!("{} {}", count, label))
        .collect();
    println!();
    println!("📊 {} blocks: {}", table.rows.len(), summary.join(", "));
}

/// Truncate hash string to specified length
fn truncate_hash(hash: &str, max_len: usize) -> &str {
    match hash.char_indices().nth(max_len) {
        Some((end, _)) => &hash[..end],
        None => hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::BlockRow;
    use crate::render::render_row;
    use crate::table::RenderedRow;

    fn rendered(statuses: &[i64]) -> RenderedTable {
        let rows = statuses
            .iter()
            .enumerate()
            .map(|(i, &status)| {
                let source = BlockRow {
                    height: i as u64,
                    hash: "ab".to_string(),
                    time: "2023-01-01 00:00:00".to_string(),
                    status,
                    tx_count: 0,
                };
                RenderedRow { cells: render_row(i, &source), source }
            })
            .collect();
        RenderedTable { rows, ..Default::default() }
    }

    #[test]
    fn counts_statuses_in_first_seen_order() {
        let counts = status_counts(&rendered(&[1, 2, 1, 9]));
        assert_eq!(
            counts,
            [("Success".to_string(), 2), ("Pending".to_string(), 1), ("9".to_string(), 1)]
        );
    }

    #[test]
    fn truncates_long_hashes_only() {
        assert_eq!(truncate_hash("abcdef", 4), "abcd");
        assert_eq!(truncate_hash("abc", 4), "abc");
    }
}
