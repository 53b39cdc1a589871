pub mod ai_provider;
pub mod config;
pub mod core;
pub mod dashboard;
pub mod export;
pub mod flows;
pub mod generators;
pub mod monitoring;
pub mod pipeline;
pub mod rate_limit;
pub mod server;
