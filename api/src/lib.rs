pub mod app;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extract;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
