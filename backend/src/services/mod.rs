//! Business logic services, one per domain area.

pub mod dispense_service;
pub mod machine_service;
pub mod user_service;
pub mod wallet_service;
