//! # Status Page Library
//!
//! Multi-tenant status pages: organizations mirrored from the identity
//! provider register services, publish incidents and schedule maintenance.

pub mod auth;
pub mod cascade;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod seeds;
pub mod server;
pub mod status;
pub mod telemetry;
pub mod webhook_verification;
pub use migration;
