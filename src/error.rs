// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for Blurwatch

use thiserror::Error;

/// Result type alias for Blurwatch operations
pub type Result<T> = std::result::Result<T, BlurwatchError>;

/// Blurwatch error types
#[derive(Error, Debug)]
pub enum BlurwatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Settings parse error on line {line}: {message}")]
    Settings { line: usize, message: String },

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("History error: {0}")]
    History(String),

    #[error("Task error: {0}")]
    Task(String),
}
