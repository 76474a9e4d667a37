pub mod analytics;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod models;
pub mod output;
pub mod publish;
pub mod session;
pub mod store;
