pub mod analysis;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod fetch;
pub mod output;
