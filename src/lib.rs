// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Blurwatch: keeps an editor background image blurred
//!
//! Watches one settings file. Whenever it changes and blurring is switched on,
//! the referenced background image is stack-blurred into a new file and the
//! settings are rewritten to point at it.

pub mod config;
pub mod error;
pub mod history;
pub mod imaging;
pub mod process;
pub mod rewrite;
pub mod settings;
pub mod watcher;

pub use config::AppConfig;
pub use error::{BlurwatchError, Result};
pub use process::{Outcome, Processor, SkipReason};
