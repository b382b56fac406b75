pub mod config;
pub mod downloader;
pub mod logging;

#[cfg(feature = "gui")]
pub mod gui;
