//! Core pipeline orchestration and domain logic for AutoNiche.
//!
//! This crate ties together the candidate source, rotation policy, entity
//! resolver, publisher, and announcer into the end-to-end runs driven by the
//! CLI (`generate`, `run_all`, `announce_latest`).

pub mod pipeline;
pub mod selector;
