pub mod api;
pub mod auth;
pub mod commands;
pub mod config;
pub mod db;
pub mod metrics;
pub mod report;
pub mod upstream;
