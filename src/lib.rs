//! Theme generator for chat overlays
//!
//! Asks a generative model for a themed visual configuration, digs the JSON
//! theme out of whatever text comes back, normalizes it against known presets
//! and drives the per-attempt retry protocol across the text and image phases.

pub mod ai;
pub mod app;
pub mod error;
pub mod extract;
pub mod models;
pub mod orchestrator;
pub mod presets;
pub mod prompts;
pub mod scheduler;
pub mod validate;
pub mod web;

pub use error::{Error, Result};
