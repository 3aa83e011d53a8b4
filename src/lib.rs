pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod service;

pub use api::router;
pub use backend::BackendClient;
pub use config::AppConfig;
pub use error::{AppError, BackendError, LookupError};
pub use service::CheckService;
