//! Integration tests for the draftsmith generation pipeline

mod config_layering;
mod generation_client;
mod pipeline;
mod store_backends;
