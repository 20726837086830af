//! Central module for organizing the application's main API endpoints.
//!
//! This module acts as a top-level container for different API domains —
//! QR resolution, wallet, dispensing, and machine provisioning — excluding
//! core authentication routes which are handled separately.

pub mod common;
pub mod dispense;
pub mod machine;
pub mod qr;
pub mod wallet;
