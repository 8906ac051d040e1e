pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod data;
pub mod logging;
pub mod matching;
pub mod state;
pub mod store;
pub mod utils;
pub mod web;
