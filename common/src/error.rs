//! エラー型定義

use thiserror::Error;

use crate::workflow::View;

/// 共通エラー型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),

    #[error("Configuration incomplete: {0}")]
    NotReady(String),

    #[error("Unknown {kind} option: {id}")]
    UnknownOption { kind: &'static str, id: String },

    #[error("Cannot {action} while {from}")]
    InvalidTransition { from: View, action: &'static str },

    #[error("Unknown generated image: {0}")]
    UnknownImage(String),

    #[error("Edit instruction is empty")]
    EmptyInstruction,

    #[error("An edit is already in progress")]
    EditInFlight,
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
