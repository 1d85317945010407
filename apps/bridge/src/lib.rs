//! Office Bridge Library
//!
//! Translates the line-delimited JSON event stream of an AI agent harness
//! into agent state changes and pushes them to connected browser observers.

pub mod api;
pub mod bridge;
pub mod config;
pub mod domain;
