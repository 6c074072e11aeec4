// File: src/tui_dashboard.rs
// Terminal UI dashboard using ratatui

use std::{
    io,
    sync::Arc,
    time::Duration,
};

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame, Terminal,
};
use tracing::info;

use crate::data_models::AppConfig;
use crate::render::Markup;
use crate::source::HttpSource;
use crate::table::{
    BlockTableController, LATEST_BLOCKS_MOUNT, RefreshHandle, RenderedTable, TableConfig, TableMount,
};

/// Application state for TUI
pub struct TuiApp {
    pub config: AppConfig,
    pub controller: BlockTableController,
    pub table: RenderedTable,
    pub should_quit: bool,
    pub reload_requested: bool,
}

impl TuiApp {
    pub fn new(config: AppConfig) -> Result<Self> {
        let table_config = TableConfig {
            refresh_interval: config.refresh_interval,
            ..TableConfig::default()
        };
        // A hung explorer must not stall the event loop past one refresh period
        let source = HttpSource::with_timeout(&config.explorer_url, &table_config.endpoint, config.refresh_interval)?;
        let controller = BlockTableController::new(
            TableMount::new(LATEST_BLOCKS_MOUNT),
            Arc::new(source),
            table_config,
        );
        Ok(Self {
            config,
            controller,
            table: RenderedTable::default(),
            should_quit: false,
            reload_requested: false,
        })
    }

    /// Copy the mount contents for the next frame
    pub async fn sync_table(&mut self) {
        self.table = self.controller.mount().snapshot().await;
    }

    /// Handle keyboard input
    pub fn handle_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('r') => {
                self.reload_requested = true;
            }
            _ => {}
        }
    }
}

/// Run the TUI dashboard
pub async fn run_tui_mode(config: &AppConfig) -> Result<()> {
    let mut app = TuiApp::new(config.clone())?;
    let refresh = app.controller.initialize(true).await?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app, refresh.as_ref()).await;

    if let Some(handle) = refresh {
        handle.cancel();
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    info!("terminal dashboard closed");
    println!("👋 Block explorer dashboard closed");

    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut TuiApp,
    refresh: Option<&RefreshHandle>,
) -> Result<()> {
    let tick_rate = Duration::from_millis(250);

    loop {
        app.sync_table().await;
        let view: &TuiApp = app;
        terminal.draw(|f| ui(f, view, refresh))?;

        // Handle events
        if event::poll(Duration::from_millis(0))? {
            if let Event::Key(key) = event::read()? {
                app.handle_input(key.code);
            }
        }

        // Check if should quit
        if app.should_quit {
            return Ok(());
        }

        if app.reload_requested {
            app.reload_requested = false;
            app.controller.reload().await?;
        }

        // Yield to the refresh task instead of blocking in poll
        tokio::time::sleep(tick_rate).await;
    }
}

/// Render the UI
fn ui(f: &mut Frame, app: &TuiApp, refresh: Option<&RefreshHandle>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(4),  // Header
            Constraint::Min(10),    // Latest blocks
            Constraint::Length(3),  // Footer
        ])
        .split(f.area());

    render_header(f, chunks[0], app, refresh);
    render_latest_blocks(f, chunks[1], &app.table);
    render_footer(f, chunks[2]);
}

/// Render header section
fn render_header(f: &mut Frame, area: Rect, app: &TuiApp, refresh: Option<&RefreshHandle>) {
    let refreshed = app
        .table
        .refreshed_at
        .map(|at| at.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());
    let cycle = match refresh {
        Some(handle) if handle.is_active() => format!("every {}ms ({} reloads)", handle.period().as_millis(), handle.ticks()),
        _ => "off".to_string(),
    };

    let mut status_line = vec![
        Span::styled("Last draw: ", Style::default().fg(Color::Gray)),
        Span::styled(refreshed, Style::default().fg(Color::White)),
        Span::styled("  Auto refresh: ", Style::default().fg(Color::Gray)),
        Span::styled(cycle, Style::default().fg(Color::White)),
    ];
    if let Some(error) = &app.table.last_error {
        status_line.push(Span::styled(format!("  ⚠ {}", error), Style::default().fg(Color::Red)));
    }

    let header = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("🔍 ", Style::default().fg(Color::Yellow)),
            Span::styled("Block Explorer", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::styled(format!(" - {}", app.config.explorer_url), Style::default().fg(Color::Gray)),
        ]),
        Line::from(status_line),
    ])
    .block(Block::default().borders(Borders::ALL).title("Latest Blocks Monitor"));

    f.render_widget(header, area);
}

/// Terminal colour for a badge class
fn badge_color(class: &str) -> Color {
    match class {
        "success" => Color::Green,
        "brand" => Color::Magenta,
        "metal" => Color::Gray,
        "primary" => Color::Blue,
        "info" => Color::Cyan,
        "danger" => Color::Red,
        "warning" => Color::Yellow,
        _ => Color::White,
    }
}

fn markup_cell(markup: &Markup) -> Cell<'static> {
    match markup {
        Markup::Badge { title, class } => Cell::from(*title).style(
            Style::default().fg(badge_color(class)).add_modifier(Modifier::BOLD),
        ),
        Markup::Link { text, .. } => Cell::from(text.clone()).style(Style::default().fg(Color::LightBlue)),
        other => Cell::from(other.text().to_string()),
    }
}

/// Render latest blocks
fn render_latest_blocks(f: &mut Frame, area: Rect, table: &RenderedTable) {
    let header_cells = table
        .columns
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let rows = table
        .rows
        .iter()
        .map(|row| Row::new(row.cells.iter().map(markup_cell).collect::<Vec<_>>()));

    let widths = [
        Constraint::Length(12),
        Constraint::Min(20),
        Constraint::Length(10),
        Constraint::Length(11),
        Constraint::Length(5),
    ];

    let block = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("📊 Latest Blocks"));

    f.render_widget(block, area);
}

/// Render footer
fn render_footer(f: &mut Frame, area: Rect) {
    let footer = Paragraph::new("Press 'q' to quit, 'r' to reload")
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_quit_and_reload() {
        let mut app = TuiApp::new(AppConfig::default()).unwrap();
        app.handle_input(KeyCode::Char('r'));
        assert!(app.reload_requested);
        assert!(!app.should_quit);
        app.handle_input(KeyCode::Esc);
        assert!(app.should_quit);
    }

    #[test]
    fn every_badge_class_has_a_colour() {
        for descriptor in crate::status::STATUS_DESCRIPTORS {
            assert_ne!(badge_color(descriptor.badge_class), Color::White);
        }
    }
}
