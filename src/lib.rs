#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod config;
pub mod data;
pub mod debounce;
pub mod details;
pub mod logging;
pub mod modal;
pub mod omdb;
pub mod search;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
