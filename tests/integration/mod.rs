//! Integration tests module
//!
//! This module organizes all integration tests for the r-focusplay application.

// Import individual test modules
pub mod config_test;
pub mod library_test;
pub mod property_test;
pub mod scenario_test;
