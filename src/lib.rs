pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod orchestrator;
pub mod registry;
pub mod research;
pub mod store;
