pub mod app;
pub mod auth;
pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod seed;
pub mod server;
pub mod state;
pub mod storage;
