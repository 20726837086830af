//! Collection of general utility functions and common traits.
//!
//! This module serves as a repository for small, reusable helper functions
//! that do not fit into other specific domain modules.

pub mod generate_random_string;
pub mod jwt;
pub mod qr_signature;

/// Placeholder location used when the backend omits a machine's location.
pub const UNKNOWN_LOCATION: &str = "unknown";
