use std::sync::{Mutex, PoisonError};

use oti_store::{RecordStore, StoredRecord, VersionStore};
use serde::Deserialize;
use thiserror::Error;

use crate::mapping::ComponentMappingTable;
use crate::matcher::{RecordAction, RecordMatcher};
use crate::summary::{RecordError, RecordOutcome, RunSummary, StepSummary};

/// Version reached once launcher components have been remapped.
pub const REMAP_TARGET_VERSION: u32 = 1;

/// Serializes runs within the process; the version read-then-write is not
/// atomic.
static RUN_LOCK: Mutex<()> = Mutex::new(());

/// A single migration step that moves the stores from one version to the next.
///
/// Steps form a linear chain: 0→1, 1→2, etc. A step must be safe to run
/// again from the start if the process dies before its version is
/// committed.
pub trait MigrationStep<R: RecordStore> {
    /// Short name used in logs.
    fn name(&self) -> &str;
    /// Source version.
    fn source_version(&self) -> u32;
    /// Target version.
    fn target_version(&self) -> u32;
    /// Apply the step to the record store.
    fn run(&self, records: &mut R, config: &MigrationConfig)
        -> Result<StepSummary, MigrationError>;
}

/// Error during migration. When returned, the version was not advanced past
/// the failing step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    /// The version chain has a gap (e.g., v1→v3 without v2).
    #[error("missing migration step for v{missing}")]
    GapInChain { missing: u32 },
    /// The record store could not be queried and
    /// [`MigrationConfig::advance_on_store_failure`] is off.
    #[error("record store unavailable: {0}")]
    Store(String),
    /// The new version could not be persisted.
    #[error("failed to commit version v{version}: {reason}")]
    VersionCommit { version: u32, reason: String },
}

/// Configuration for the migration engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationConfig {
    /// If true, a record store that cannot be queried counts as "nothing to
    /// migrate" and the version still advances. If false, the run fails
    /// and the step is retried on the next invocation.
    pub advance_on_store_failure: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            advance_on_store_failure: true,
        }
    }
}

/// The version-gated migration runner.
///
/// Reads the stored version, runs every registered step above it in order,
/// and commits each step's target version once the step completes. Runs
/// at or beyond the final target are no-ops that never touch the record
/// store.
///
/// # Example
///
/// ```
/// use oti_migrate::{ComponentMappingTable, MigrationConfig, MigrationEngine};
/// use oti_store::{MemoryRecordStore, MemoryVersionStore, RecordStore, StoredRecord, VersionStore};
///
/// let table = ComponentMappingTable::from_arrays(
///     Some(&["com.old/.Main"][..]),
///     Some(&["com.new/.Main"][..]),
/// )
/// .unwrap();
/// let engine = MigrationEngine::with_mapping(table, MigrationConfig::default());
///
/// let mut prefs = MemoryVersionStore::new();
/// let mut favorites = MemoryRecordStore::with_records([StoredRecord::new(
///     1,
///     "#Intent;action=android.intent.action.MAIN;\
///      category=android.intent.category.LAUNCHER;component=com.old/.Main;end",
/// )]);
///
/// let summary = engine.run(&mut prefs, &mut favorites).unwrap();
/// assert_eq!(summary.records.renamed, 1);
/// assert_eq!(prefs.get(), 1);
///
/// // Second run is a no-op.
/// assert!(engine.run(&mut prefs, &mut favorites).unwrap().already_current());
/// ```
pub struct MigrationEngine<R: RecordStore> {
    steps: Vec<Box<dyn MigrationStep<R>>>,
    config: MigrationConfig,
}

impl<R: RecordStore> MigrationEngine<R> {
    /// Create an engine with no steps.
    pub fn new(config: MigrationConfig) -> Self {
        Self {
            steps: Vec::new(),
            config,
        }
    }

    /// Create an engine with the launcher remapping step (0→1) registered.
    pub fn with_mapping(table: ComponentMappingTable, config: MigrationConfig) -> Self {
        let mut engine = Self::new(config);
        engine.register(Box::new(RemapComponents::new(table)));
        engine
    }

    /// Register a migration step.
    pub fn register(&mut self, step: Box<dyn MigrationStep<R>>) {
        self.steps.push(step);
        // Keep sorted by source version for efficient lookup
        self.steps.sort_by_key(|s| s.source_version());
    }

    /// The version reached when every step has run.
    pub fn target_version(&self) -> u32 {
        self.steps
            .iter()
            .map(|s| s.target_version())
            .max()
            .unwrap_or(0)
    }

    /// The engine configuration.
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Check if a store at `version` has work left.
    pub fn needs_migration(&self, version: u32) -> bool {
        version < self.target_version()
    }

    /// Validate that the step chain is complete from `min_version` to the target.
    pub fn validate_chain(&self, min_version: u32) -> Result<(), MigrationError> {
        let mut version = min_version;
        while version < self.target_version() {
            let step = self.step_from(version)?;
            version = step.target_version();
        }
        Ok(())
    }

    /// List all registered steps as (from, to) pairs.
    pub fn registered_steps(&self) -> Vec<(u32, u32)> {
        self.steps
            .iter()
            .map(|s| (s.source_version(), s.target_version()))
            .collect()
    }

    /// Bring the stores up to [`target_version`](Self::target_version).
    pub fn run<V: VersionStore>(
        &self,
        versions: &mut V,
        records: &mut R,
    ) -> Result<RunSummary, MigrationError> {
        let _guard = RUN_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

        let current = versions.get();
        let target = self.target_version();
        let mut summary = RunSummary::starting_at(current);

        if current >= target {
            tracing::debug!(current, target, "mapping already up to date");
            return Ok(summary);
        }
        self.validate_chain(current)?;

        let mut version = current;
        while version < target {
            let step = self.step_from(version)?;
            let to = step.target_version();
            tracing::info!(step = step.name(), from = version, to, "updating mapping version");

            let step_summary = step.run(records, &self.config)?;
            versions
                .set(to)
                .map_err(|e| MigrationError::VersionCommit {
                    version: to,
                    reason: e.to_string(),
                })?;

            tracing::info!(
                step = step.name(),
                version = to,
                scanned = step_summary.scanned,
                renamed = step_summary.renamed,
                deleted = step_summary.deleted,
                skipped = step_summary.skipped,
                failed = step_summary.failed,
                store_unavailable = step_summary.store_unavailable,
                "migration step committed"
            );
            summary.push_step(version, to, &step_summary);
            version = to;
        }

        Ok(summary)
    }

    fn step_from(&self, version: u32) -> Result<&dyn MigrationStep<R>, MigrationError> {
        self.steps
            .iter()
            .find(|s| s.source_version() <= version && version < s.target_version())
            .map(|s| s.as_ref())
            .ok_or(MigrationError::GapInChain { missing: version })
    }
}

/// Step 0→1: rewrite or remove launcher favorites per the mapping table.
pub struct RemapComponents {
    table: ComponentMappingTable,
}

impl RemapComponents {
    pub fn new(table: ComponentMappingTable) -> Self {
        Self { table }
    }

    fn apply_record<R: RecordStore>(
        matcher: &RecordMatcher<'_>,
        records: &mut R,
        row: &StoredRecord,
    ) -> Result<RecordOutcome, RecordError> {
        let intent = match row.intent.as_deref() {
            Some(i) if !i.is_empty() => i,
            _ => return Ok(RecordOutcome::Untouched),
        };

        let mut outcome = RecordOutcome::Untouched;
        for action in matcher.plan(intent)? {
            match action {
                RecordAction::Update(uri) => {
                    records
                        .update(row.id, &uri)
                        .map_err(|e| RecordError::Store(e.to_string()))?;
                    outcome = RecordOutcome::Renamed;
                }
                RecordAction::Delete => {
                    records
                        .delete(row.id)
                        .map_err(|e| RecordError::Store(e.to_string()))?;
                    outcome = RecordOutcome::Deleted;
                }
            }
        }
        Ok(outcome)
    }
}

impl<R: RecordStore> MigrationStep<R> for RemapComponents {
    fn name(&self) -> &str {
        "remap-launcher-components"
    }

    fn source_version(&self) -> u32 {
        0
    }

    fn target_version(&self) -> u32 {
        REMAP_TARGET_VERSION
    }

    fn run(
        &self,
        records: &mut R,
        config: &MigrationConfig,
    ) -> Result<StepSummary, MigrationError> {
        let mut summary = StepSummary::default();

        if self.table.is_empty() {
            tracing::info!("mapping table is empty, nothing to remap");
            return Ok(summary);
        }

        let rows = match records.query_all() {
            Ok(rows) => rows,
            Err(e) if config.advance_on_store_failure => {
                tracing::warn!(error = %e, "launcher favorites unavailable, skipping remap");
                summary.store_unavailable = true;
                return Ok(summary);
            }
            Err(e) => return Err(MigrationError::Store(e.to_string())),
        };
        tracing::debug!(total = rows.len(), "launcher favorites loaded");

        let matcher = RecordMatcher::new(&self.table);
        for row in &rows {
            summary.scanned += 1;
            let result = Self::apply_record(&matcher, records, row);
            if let Err(e) = &result {
                tracing::warn!(id = row.id, error = %e, "problem remapping favorite");
            }
            summary.record(&result);
        }
        Ok(summary)
    }
}
