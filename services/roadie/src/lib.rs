pub mod ai_adapter;
pub mod auth;
pub mod calendar_adapter;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
