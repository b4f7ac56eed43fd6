pub mod config;
pub mod models;
pub mod slack_config;
