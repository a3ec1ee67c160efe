//! HTTP service for the practice assistant: configuration, the PostgreSQL and
//! OpenAI adapters behind the core ports, and the axum REST surface.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
