pub mod cart;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod tui;

pub use error::{Error, Result};
