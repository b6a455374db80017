use serde::Serialize;
use thiserror::Error;

use crate::intent::IntentParseError;

/// How a single favorite fared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// No mapping entry matched (or the row has no intent).
    Untouched,
    /// The intent was rewritten.
    Renamed,
    /// The row was removed.
    Deleted,
}

/// Why a favorite could not be processed. Never aborts the run.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The stored intent could not be parsed; the row was skipped.
    #[error("unparseable intent: {0}")]
    Parse(#[from] IntentParseError),
    /// The record store rejected an update or delete.
    #[error("record store write failed: {0}")]
    Store(String),
}

/// Per-step record counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepSummary {
    /// Rows read from the record store.
    pub scanned: usize,
    /// Rows whose intent was rewritten.
    pub renamed: usize,
    /// Rows removed.
    pub deleted: usize,
    /// Rows skipped because their intent did not parse.
    pub skipped: usize,
    /// Rows where a store write failed.
    pub failed: usize,
    /// The record store could not be queried at all.
    pub store_unavailable: bool,
}

impl StepSummary {
    /// Fold one row's result into the counts.
    pub fn record(&mut self, result: &Result<RecordOutcome, RecordError>) {
        match result {
            Ok(RecordOutcome::Untouched) => {}
            Ok(RecordOutcome::Renamed) => self.renamed += 1,
            Ok(RecordOutcome::Deleted) => self.deleted += 1,
            Err(RecordError::Parse(_)) => self.skipped += 1,
            Err(RecordError::Store(_)) => self.failed += 1,
        }
    }

    fn absorb(&mut self, other: &StepSummary) {
        self.scanned += other.scanned;
        self.renamed += other.renamed;
        self.deleted += other.deleted;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.store_unavailable |= other.store_unavailable;
    }
}

/// Result of one [`MigrationEngine::run`](crate::MigrationEngine::run).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Version read at the start of the run.
    pub from_version: u32,
    /// Version committed at the end of the run.
    pub to_version: u32,
    /// Steps applied, as `(from, to)` pairs.
    pub steps: Vec<(u32, u32)>,
    /// Record counts summed over all steps.
    pub records: StepSummary,
}

impl RunSummary {
    pub(crate) fn starting_at(version: u32) -> Self {
        Self {
            from_version: version,
            to_version: version,
            ..Self::default()
        }
    }

    pub(crate) fn push_step(&mut self, from: u32, to: u32, step: &StepSummary) {
        self.steps.push((from, to));
        self.to_version = to;
        self.records.absorb(step);
    }

    /// Whether the run found nothing to do.
    pub fn already_current(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_counts() {
        let mut s = StepSummary::default();
        s.record(&Ok(RecordOutcome::Renamed));
        s.record(&Ok(RecordOutcome::Deleted));
        s.record(&Ok(RecordOutcome::Untouched));
        s.record(&Err(RecordError::Parse(IntentParseError::Unterminated)));
        s.record(&Err(RecordError::Store("boom".into())));
        assert_eq!(
            s,
            StepSummary {
                scanned: 0,
                renamed: 1,
                deleted: 1,
                skipped: 1,
                failed: 1,
                store_unavailable: false,
            }
        );
    }

    #[test]
    fn run_summary_accumulates_steps() {
        let mut run = RunSummary::starting_at(0);
        assert!(run.already_current());

        run.push_step(
            0,
            1,
            &StepSummary {
                scanned: 3,
                renamed: 2,
                ..StepSummary::default()
            },
        );
        assert_eq!(run.to_version, 1);
        assert_eq!(run.steps, vec![(0, 1)]);
        assert_eq!(run.records.scanned, 3);
        assert_eq!(run.records.renamed, 2);
        assert!(!run.already_current());
    }
}
