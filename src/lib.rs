//! Draftsmith: long-form document generation over rate-limited LLM providers
//!
//! A gated, retrying completion client feeds a fan-out orchestrator that
//! selects a title, generates every section of a document concurrently with
//! per-section failure isolation, and expands the result until it reaches a
//! target word count.

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod generation;
pub mod logging;
pub mod provider;
pub mod service;
pub mod store;
pub mod types;
