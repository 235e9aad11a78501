#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

pub mod auth;
pub mod cli;
pub mod config;
pub mod contaazul;
pub mod error;
pub mod gateway;
pub mod storage;
pub mod sync;

pub use config::Config;
pub use error::{BridgeError, Result};
