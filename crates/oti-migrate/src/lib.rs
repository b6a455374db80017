//! # oti-migrate
//!
//! One-time, version-gated remapping of launcher favorites.
//!
//! After an upgrade renames or removes activities, home-screen shortcuts
//! still point at the old components. `oti-migrate` rewrites them once:
//! it reads a stored mapping version, and if it is below the target it walks
//! every favorite, rewrites or deletes the ones whose intent launches a
//! component listed in the mapping table, then commits the new version so
//! later invocations are no-ops.
//!
//! ## How It Works
//!
//! 1. The mapping table is loaded from two parallel arrays of
//!    `package/class` strings ([`MappingFile`], [`ComponentMappingTable`]).
//! 2. [`MigrationEngine::run`] reads the version from a
//!    [`VersionStore`](oti_store::VersionStore).
//! 3. Below the target, each step runs in order. The remapping step parses
//!    every favorite's intent ([`IntentDescriptor`]) and asks the
//!    [`RecordMatcher`] which updates or deletes apply.
//! 4. Each step's target version is committed after the step completes.
//!
//! ## Key Concepts
//!
//! - **Idempotent**: re-running a step from scratch yields the same stores.
//! - **Per-record isolation**: a favorite that fails to parse or write is
//!   logged and counted in the [`RunSummary`]; the run goes on.
//! - **At-least-attempted**: by default an unreachable record store still
//!   advances the version (see [`MigrationConfig::advance_on_store_failure`]).

mod component;
mod config;
mod engine;
mod intent;
mod mapping;
mod matcher;
mod summary;

pub use component::{ComponentError, ComponentRef};
pub use config::{ConfigError, MappingFile};
pub use engine::{
    MigrationConfig, MigrationEngine, MigrationError, MigrationStep, RemapComponents,
    REMAP_TARGET_VERSION,
};
pub use intent::{IntentDescriptor, IntentParseError, ACTION_MAIN, ACTION_VIEW, CATEGORY_LAUNCHER};
pub use mapping::{ComponentMappingTable, MappingEntry};
pub use matcher::{RecordAction, RecordMatcher};
pub use summary::{RecordError, RecordOutcome, RunSummary, StepSummary};
