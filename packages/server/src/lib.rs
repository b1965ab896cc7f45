//! `memkv` server: HTTP transport over a single in-memory store backend.

pub mod config;
pub mod logging;
pub mod network;

pub use config::ServerArgs;
