//! HTTP API.

pub mod connections;
pub mod doubts;
pub mod error;
pub mod matching;
pub mod middleware;
pub mod routes;
pub mod status;
pub mod users;

pub use routes::*;
