pub mod types;
pub mod model;
pub mod error;
pub mod config;
pub mod interfaces;
pub mod accrual_service;
pub mod ledger;
pub mod reconciler;
pub mod scheduler;
pub mod reporter;
pub mod withdrawal;
pub mod service;
pub mod observability;
pub mod api;
pub mod utils;

pub use error::{Error, ErrorKind, Result};
