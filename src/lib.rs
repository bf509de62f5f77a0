pub mod api;
pub mod catalog;
pub mod config;
#[cfg(target_os = "macos")]
pub mod corebluetooth;
pub mod data_source;
mod error;
pub mod peripheral;

pub use error::{Error, ErrorType, Result};
