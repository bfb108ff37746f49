//! Paginated read results.

use serde::{Deserialize, Serialize};

/// One page of a journal, most recent entry first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Number of entries across all pages (after filtering).
    pub total: usize,
    /// 1-based page number.
    pub page: usize,
    pub per_page: usize,
    pub pages: usize,
}
