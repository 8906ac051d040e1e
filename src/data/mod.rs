//! Domain data access over a [`DocumentStore`](crate::store::DocumentStore).

pub mod connections;
pub mod doubts;
pub mod models;
pub mod seed;
pub mod users;
