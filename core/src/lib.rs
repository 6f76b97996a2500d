pub mod db;
pub mod error;
pub mod models;
pub mod schedule;
pub mod service;
pub mod week;

pub use error::{Error, Result};
pub use service::ChoreService;
