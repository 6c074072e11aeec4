// File: src/lib.rs
// Block explorer with an auto-refreshing latest-blocks table

pub mod chain;
pub mod cli_interface;
pub mod data_models;
pub mod render;
pub mod source;
pub mod status;
pub mod table;
pub mod telemetry;
pub mod tui_dashboard;
pub mod web_server;

pub use data_models::{AppConfig, BlockPage, BlockRow, PageRequest};
pub use table::{BlockTableController, ControllerError, RefreshHandle, TableConfig, TableMount};
