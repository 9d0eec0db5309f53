//! Result aggregation.
//!
//! Collects per-target outcomes into the ordered record list handed back to
//! the caller.

use crate::domain::models::{Handle, OperationResult, OperationTarget, Outcome};

/// Outcome counts for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeSummary {
    pub values: usize,
    pub invalid_targets: usize,
    pub not_permitted: usize,
    pub timeouts: usize,
}

impl OutcomeSummary {
    pub fn total(&self) -> usize {
        self.values + self.invalid_targets + self.not_permitted + self.timeouts
    }
}

#[derive(Debug, Default)]
pub struct ResultAggregator {
    results: Vec<OperationResult>,
}

impl ResultAggregator {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            results: Vec::with_capacity(capacity),
        }
    }

    /// Record an outcome in arrival order.
    pub fn record(
        &mut self,
        target: OperationTarget,
        handle: Option<Handle>,
        outcome: Outcome,
        input: Option<Vec<u8>>,
        attempts: u32,
    ) {
        self.results.push(OperationResult {
            target,
            handle,
            outcome,
            input,
            attempts,
        });
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn summary(&self) -> OutcomeSummary {
        summarize(&self.results)
    }

    pub fn finish(self) -> Vec<OperationResult> {
        self.results
    }
}

pub fn summarize(results: &[OperationResult]) -> OutcomeSummary {
    results
        .iter()
        .fold(OutcomeSummary::default(), |mut summary, result| {
            match result.outcome {
                Outcome::Value(_) => summary.values += 1,
                Outcome::InvalidTarget => summary.invalid_targets += 1,
                Outcome::NotPermitted => summary.not_permitted += 1,
                Outcome::Timeout => summary.timeouts += 1,
            }
            summary
        })
}

/// Split results into (handle-addressed, UUID-addressed), keeping order
/// within each group.
///
/// Front ends print the two groups as separate tables: handle results as
/// (handle, data) rows and UUID results as (uuid, handle, data) rows.
pub fn split_by_kind(
    results: Vec<OperationResult>,
) -> (Vec<OperationResult>, Vec<OperationResult>) {
    results
        .into_iter()
        .partition(|r| matches!(r.target, OperationTarget::Handle(_)))
}
