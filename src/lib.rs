#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`VulnmatchError`)
//! - [`config`]: Engine configuration (`MatchEngineConfig`, builder)
//! - [`types`]: Domain types (`PackageReference`, `AffectedPackage`, `AffectedSymbol`,
//!   `VulnerabilityMatch`, `MatchPage`, `ScanReport`)
//! - [`version`]: Version constraint evaluator (`satisfies`)
//! - [`scheme`]: Ecosystem scheme mapping (`SchemeMapping`)
//! - [`store`]: Relational store access (`MatchStore`: scan, query, migration)
//! - [`engine`]: Main orchestrator (`MatchEngine`, `MatchEngineBuilder`)
//!
//! # Architecture
//!
//! ```text
//! package_references --+                          +--> match_by_id
//!                      +--> scan_matches ---------|
//! catalog tables ------+         |                +--> list_matches
//!                                v
//!                       vulnerability_matches
//!                   (unique on upload_id, affected_package_id)
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod scheme;
pub mod store;
pub mod types;
pub mod version;

// --- Public API Re-exports ---

// Engine (main orchestrator)
pub use engine::{MatchEngine, MatchEngineBuilder};

// Configuration
pub use config::{MatchEngineConfig, MatchEngineConfigBuilder};

// Error
pub use error::VulnmatchError;

// Types
pub use types::{
    AffectedPackage, AffectedSymbol, MatchPage, PackageReference, ScanReport, VulnerabilityMatch,
};

// Scheme mapping
pub use scheme::SchemeMapping;

// Store
pub use store::MatchStore;

// Version evaluation
pub use version::satisfies;
