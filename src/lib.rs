// src/lib.rs

pub mod attempt;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;
pub mod state;
pub mod utils;

// Re-exported for the binaries and tests
pub use routes::create_router;
