//! TUI (Terminal User Interface) モジュール
//!
//! ratatui を使用したセットアップウィザード

pub mod state;
pub mod terminal;
pub mod wizard;

pub use wizard::run_setup_wizard;
