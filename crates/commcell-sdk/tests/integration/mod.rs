//! Integration tests for the Commcell SDK.
//!
//! This module covers:
//! - Service discovery, login and logout
//! - Feature wrappers against scripted and stateful mock routes

pub mod common;
pub mod features;
