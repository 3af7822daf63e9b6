pub mod config;
pub mod error;
pub mod identity;
pub mod render;
pub mod server;
pub mod storage;
pub mod theme;

pub use error::{AppError, AppResult};
