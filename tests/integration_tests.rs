//! Main integration test entry point for r-focusplay
//!
//! This file serves as the entry point for all integration tests.

// Import the individual test modules
mod integration;
