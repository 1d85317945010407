// Domain layer module exports
// Pure types and lookups; no I/O, no scheduling

pub mod agent;
pub mod tools;
