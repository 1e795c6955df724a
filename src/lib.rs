pub mod audio;
pub mod batch;
pub mod caption;
pub mod clip;
pub mod config;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod segment;

pub use batch::{print_summary, BatchOrchestrator, BatchStats};
pub use config::{Config, ErrorPolicy};
pub use error::{GranaryError, Result};
