//! Summary types returned by store operations.

use serde::{Deserialize, Serialize};

/// Row counts of the reference dataset tables.
///
/// Returned by [`Store::replace_dataset`](crate::Store::replace_dataset) (what
/// was inserted) and [`Store::dataset_summary`](crate::Store::dataset_summary)
/// (what is currently stored).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub lines: usize,
    pub news_items: usize,
    pub stops: usize,
    pub associations: usize,
    /// Stop-line pairs dropped because one side is not part of the dataset.
    #[serde(default)]
    pub skipped_associations: usize,
}

impl DatasetSummary {
    /// Whether no reference data is stored at all.
    pub fn is_empty(&self) -> bool {
        self.lines == 0 && self.stops == 0
    }
}
