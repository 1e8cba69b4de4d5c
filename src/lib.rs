pub mod config;
pub mod error;
pub mod extract;
pub mod paginate;
pub mod pipeline;
pub mod postprocess;
pub mod session;
pub mod table;

pub use config::ScrapeConfig;
pub use error::ScrapeError;
pub use pipeline::{run, ScrapeReport};
