pub mod cli;
pub mod config;
pub mod dispatch;
pub mod download;
pub mod error;
pub mod gemini;
pub mod intake;
pub mod interactive;
pub mod logging;
pub mod progress;
pub mod studio;
