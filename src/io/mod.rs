pub mod config;
pub mod fred_logger;
