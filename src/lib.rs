pub mod config;
pub mod extract;
pub mod filter;
pub mod geocode;
pub mod models;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod push;
pub mod resolve;
pub mod utils;

pub use config::{Config, SourceConfig, SourceRules};
pub use models::PermitRecord;
pub use pipeline::{run_sources, SourceReport};
