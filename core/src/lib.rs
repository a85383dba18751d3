//! Civic issue triage.
//!
//! Citizens report infrastructure problems in free text. Each report is
//! classified (category, priority, severity, department, expected response
//! time) by a keyword rule engine, optionally refined by an LLM, and stored
//! under a ticket id for administrators to triage.

pub mod auth;
pub mod classify;
pub mod config;
pub mod error;
pub mod reports;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(feature = "server")]
pub mod server;
