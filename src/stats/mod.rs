//! Reductions of remote metadata into the numbers we display.

mod filter;

pub use filter::{ExclusionPolicy, ExclusionRule};

use crate::gitlab::{DiffFileMeta, Discussion};

/// Totals over the non-excluded files of a change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStat {
    pub file_count: u64,
    pub added_lines: u64,
    pub removed_lines: u64,
}

impl DiffStat {
    /// Sum line counts of every file the policy does not exclude.
    /// Excluded files contribute nothing, whatever their counts. Totals
    /// saturate at `u64::MAX`.
    pub fn aggregate(files: &[DiffFileMeta], policy: &ExclusionPolicy) -> Self {
        files
            .iter()
            .filter(|f| !policy.is_excluded(&f.new_path))
            .fold(Self::default(), |acc, f| Self {
                file_count: acc.file_count.saturating_add(1),
                added_lines: acc.added_lines.saturating_add(f.added_lines),
                removed_lines: acc.removed_lines.saturating_add(f.removed_lines),
            })
    }
}

/// Visual category of a thread badge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeTone {
    /// Unresolved threads remain
    Attention,
    /// Every resolvable thread is resolved
    Complete,
}

/// Thread resolution counts of one merge request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreadStat {
    pub resolved: u64,
    pub resolvable: u64,
}

impl ThreadStat {
    /// Both counters are taken as reported; a resolved flag on a
    /// non-resolvable discussion still counts as resolved.
    pub fn from_discussions(discussions: &[Discussion]) -> Self {
        discussions.iter().fold(Self::default(), |acc, d| Self {
            resolved: acc.resolved.saturating_add(u64::from(d.resolved)),
            resolvable: acc.resolvable.saturating_add(u64::from(d.resolvable)),
        })
    }

    /// `None` when there is nothing to resolve (or the counts are inconsistent)
    pub fn tone(&self) -> Option<BadgeTone> {
        if self.resolved < self.resolvable {
            Some(BadgeTone::Attention)
        } else if self.resolved == self.resolvable && self.resolvable > 0 {
            Some(BadgeTone::Complete)
        } else {
            None
        }
    }

    pub fn label(&self) -> String {
        format!("{}/{} threads resolved", self.resolved, self.resolvable)
    }
}
