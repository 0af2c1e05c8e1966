//! Gigopt Library
//!
//! Fiverr gig optimization: a response cache with TTL expiry, a resilient
//! API client with retry and backoff, upstream clients for text generation
//! and web scraping, and a JSON-backed state store, composed by a thin
//! orchestrator.

pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod data;
pub mod optimizer;
pub mod state;
