// File: src/lib.rs
pub mod board;
pub mod cache;
pub mod calendar;
pub mod chat;
pub mod client;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod logging;
pub mod markup;
pub mod model;
pub mod paths;
pub mod prefs;
pub mod push;
pub mod session;
pub mod stream;

#[cfg(feature = "tui")]
pub mod tui;
