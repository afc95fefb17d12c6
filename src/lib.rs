//! # Resist Fingerprinting
//!
//! Browser fingerprinting resistance compiled to WebAssembly.
//!
//! Page scripts can read high-resolution timers, screen geometry, pointer
//! positions, plugin lists, canvas pixels and local-time calendar fields,
//! and combine them into an identifier that follows a user across sites.
//! This crate installs a fixed catalog of overrides on the shared type
//! descriptors so every protected page reports the same normalized values.
//!
//! ## Architecture
//!
//! ```text
//! install_resist_fingerprinting (WASM export)
//!   ↓
//! Installation boundary ── InstallReport, debug diagnostics
//!   ↓
//! Override applier ── OverrideCatalog, ConsentGate
//!   ↓
//! HostBindings ── WebHost (browser) | FakeHost (in-memory, `testing` feature)
//! ```
//!
//! ## Features
//!
//! - **One-shot**: overrides are non-configurable; a second install is a no-op
//! - **Delegating**: quantized and redirected members call the captured original
//! - **Consent-gated canvas**: the user is asked once per page before pixels leave
//! - **Failure-contained**: a failing entry is reported, the rest still install

use wasm_bindgen::prelude::*;

mod error;
pub mod fingerprint_defense;

pub use error::{ErrorCode, ResistError, Result};
pub use fingerprint_defense::boundary::{install_all, install_catalog};
pub use fingerprint_defense::capability::{HostBindings, TargetType};
pub use fingerprint_defense::catalog::{CapabilityArea, OverrideCatalog, OverrideKind, OverrideSpec};
pub use fingerprint_defense::consent::{ConsentGate, ConsentState};
pub use fingerprint_defense::{check_resist_status, get_normalized_profile, install_resist_fingerprinting};
pub use fingerprint_defense::normalize::{quantize_time, utc_redirection_table, UtcRedirect};
pub use fingerprint_defense::profile::{NormalizedProfile, ResistConfig};
pub use fingerprint_defense::report::{
    Diagnostic, EntryOutcome, EntryResult, InstallReport, InstallStatus,
};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // A host page may have set up its own logger already
    let _ = console_log::init_with_level(log::Level::Info);

    log::info!("Fingerprinting resistance module initialized");
}
