//! Kiosk-side QR resolution and dispense handoff flow.
//!
//! This module is the client half of the kiosk contract: it turns a scanned
//! or typed payload into a verified machine, carries that intent across the
//! hosted sign-in redirect, and executes the balance-checked dispense against
//! the backend. It talks to any server implementing the `/api/qr/resolve`,
//! `/api/me/wallet`, `/api/dispense/config`, and `/api/dispense` endpoints.
//!
//! The flow is resumable by construction: when a scan lands before sign-in,
//! the verified intent is persisted in a single-slot durable store and
//! consumed exactly once after authentication completes, regardless of which
//! page the identity provider redirects back to.

pub mod auth;
pub mod controller;
pub mod dispense;
pub mod intent;
pub mod parser;
pub mod scan;
pub mod validator;

pub use auth::{AuthProvider, AuthStatus, HostedAuthProvider};
pub use controller::{FlowController, FlowErrorKind, FlowState, ResolveOutcome,
    resume_pending_dispense};
pub use dispense::{DispenseClient, DispenseSession, DispenseStatus};
pub use intent::{FileStore, KeyValueStore, MemoryStore, PendingIntent, PendingIntentStore};
pub use parser::{MachineReference, QrParser};
pub use validator::{MachineValidator, ResolveFailure, ValidateMachine, VerifiedMachine};
