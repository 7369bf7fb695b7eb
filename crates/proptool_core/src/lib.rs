//! Core library for the property listing import tool: the schema
//! registry, draft normalizer, rule validator, two-phase import workflow,
//! diagnostic reporter, and the admin API client.

pub mod config;
pub mod normalize;
pub mod remote;
pub mod report;
pub mod schema;
pub mod validate;
pub mod workflow;
