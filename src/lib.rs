// ===============================
// src/lib.rs
// ===============================
pub mod app;
pub mod builder;
pub mod classifier;
pub mod config;
pub mod counterparty;
pub mod domain;
pub mod handler;
pub mod metrics;
pub mod policy;
pub mod recorder;
pub mod session;

#[cfg(test)]
mod testing;
