//! Result types produced by a validation pass over the most recent blocks.

use alloy_primitives::BlockNumber;
use core::{fmt, ops::RangeInclusive};
use serde::{Deserialize, Serialize};

/// The outcome of re-checking a single block number against the chain source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
    /// The stored block matches the chain source.
    Validated,
    /// The stored block was missing or stale and has been overwritten.
    Invalid,
    /// The block could not be fetched or the store could not be read or written.
    /// Storage is left as it was.
    FetchError,
}

impl ValidationOutcome {
    /// Returns the outcome as a static label, suitable for metrics.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validated => "validated",
            Self::Invalid => "invalid",
            Self::FetchError => "fetch_error",
        }
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The ordered result of one validation pass.
///
/// Entries are kept in ascending block-number order. A window is produced fresh on every
/// pass and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationWindow {
    entries: Vec<(BlockNumber, ValidationOutcome)>,
}

impl ValidationWindow {
    /// Creates an empty [`ValidationWindow`] with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity) }
    }

    /// Appends the outcome for `number`.
    ///
    /// Callers push numbers in ascending order.
    pub fn push(&mut self, number: BlockNumber, outcome: ValidationOutcome) {
        debug_assert!(self.entries.last().is_none_or(|(last, _)| *last < number));
        self.entries.push((number, outcome));
    }

    /// Returns the `(number, outcome)` pairs of the window.
    pub fn entries(&self) -> &[(BlockNumber, ValidationOutcome)] {
        &self.entries
    }

    /// Returns the outcome recorded for `number`, if it was part of the window.
    pub fn outcome(&self, number: BlockNumber) -> Option<ValidationOutcome> {
        self.entries
            .binary_search_by_key(&number, |(n, _)| *n)
            .ok()
            .map(|idx| self.entries[idx].1)
    }

    /// Returns the inclusive range of block numbers covered, or `None` if the window is empty.
    pub fn range(&self) -> Option<RangeInclusive<BlockNumber>> {
        let (first, _) = self.entries.first()?;
        let (last, _) = self.entries.last()?;
        Some(*first..=*last)
    }

    /// Returns the number of entries with the given outcome.
    pub fn count(&self, outcome: ValidationOutcome) -> usize {
        self.entries.iter().filter(|(_, o)| *o == outcome).count()
    }

    /// Returns the number of block numbers in the window.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no block number was checked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if every entry validated.
    pub fn is_clean(&self) -> bool {
        self.entries.iter().all(|(_, o)| *o == ValidationOutcome::Validated)
    }
}

impl fmt::Display for ValidationWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(range) = self.range() else {
            return writeln!(f, "validation window: empty");
        };
        writeln!(
            f,
            "validation window {}..={}: {} validated, {} invalid, {} fetch errors",
            range.start(),
            range.end(),
            self.count(ValidationOutcome::Validated),
            self.count(ValidationOutcome::Invalid),
            self.count(ValidationOutcome::FetchError),
        )?;
        for (number, outcome) in &self.entries {
            writeln!(f, "  block {number}: {outcome}")?;
        }
        Ok(())
    }
}

impl FromIterator<(BlockNumber, ValidationOutcome)> for ValidationWindow {
    fn from_iter<I: IntoIterator<Item = (BlockNumber, ValidationOutcome)>>(iter: I) -> Self {
        let mut entries: Vec<_> = iter.into_iter().collect();
        entries.sort_by_key(|(n, _)| *n);
        Self { entries }
    }
}
