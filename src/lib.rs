pub mod charts;
pub mod compat;
pub mod config;
pub mod cover;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod preprocess;
pub mod report;
pub mod stats;
pub mod usernames;
pub mod validate;

/// Application name for XDG paths
pub const APP_NAME: &str = "sushe-report";
