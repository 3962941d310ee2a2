pub mod audit;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::AppState;

#[cfg(test)]
pub mod testing;
