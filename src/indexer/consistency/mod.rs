// Cross-store consistency validation
// The metadata table and vector table must describe the same catalog ids


use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::Result;
use crate::database::lancedb::FaqVectorStore;
use crate::database::sqlite::{Database, queries::FaqQueries};

/// Consistency check results between SQLite metadata and LanceDB vectors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// Number of FAQ rows in the metadata table
    pub metadata_rows: usize,
    /// Number of vectors in the vector table
    pub vector_rows: usize,
    /// Ids present in metadata but missing a vector
    pub missing_in_vectors: Vec<i64>,
    /// Ids present in the vector table without a metadata row
    pub orphaned_in_vectors: Vec<i64>,
    /// Overall consistency status
    pub is_consistent: bool,
}

/// Perform a full consistency check between the two stores
#[inline]
pub async fn validate(
    database: &Database,
    store: &FaqVectorStore,
) -> Result<ConsistencyReport> {
    debug!("Starting cross-store consistency validation");

    let metadata_ids = FaqQueries::list_ids(database.pool()).await?;
    let vector_ids = store.list_ids().await?;

    let metadata_set: HashSet<i64> = metadata_ids.iter().copied().collect();
    let vector_set: HashSet<i64> = vector_ids.iter().copied().collect();

    let mut missing_in_vectors: Vec<i64> =
        metadata_set.difference(&vector_set).copied().collect();
    missing_in_vectors.sort_unstable();

    let mut orphaned_in_vectors: Vec<i64> =
        vector_set.difference(&metadata_set).copied().collect();
    orphaned_in_vectors.sort_unstable();

    let is_consistent = missing_in_vectors.is_empty() && orphaned_in_vectors.is_empty();

    let report = ConsistencyReport {
        metadata_rows: metadata_ids.len(),
        vector_rows: vector_ids.len(),
        missing_in_vectors,
        orphaned_in_vectors,
        is_consistent,
    };

    if report.is_consistent {
        info!(
            "Index consistency validation passed ({} entries)",
            report.metadata_rows
        );
    } else {
        warn!(
            "Index consistency validation found issues: {} metadata rows, {} vectors, \
             {} missing, {} orphaned",
            report.metadata_rows,
            report.vector_rows,
            report.missing_in_vectors.len(),
            report.orphaned_in_vectors.len()
        );
    }

    Ok(report)
}
