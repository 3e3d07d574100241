//! Command implementations.

pub mod config;
pub mod context;
pub mod parse;
pub mod stats;

pub use self::config::execute_config;
pub use self::context::execute_context;
pub use self::parse::execute_parse;
pub use self::stats::execute_stats;
