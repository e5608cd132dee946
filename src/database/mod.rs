// Persistence layer
// SQLite holds the FAQ catalog metadata; LanceDB holds the question
// vectors. The two stores are kept in sync by FAQ id and validated by
// the indexer's consistency check.

pub mod lancedb;
pub mod sqlite;
