
use super::FaqVector;
use crate::SentinelError;
use arrow::array::{Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatchIterator};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType,
    query::{ExecutableQuery, QueryBase},
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const TABLE_NAME: &str = "faq_vectors";

/// Vector database store using LanceDB for FAQ similarity search
pub struct FaqVectorStore {
    connection: Connection,
    table_name: String,
    dimension: usize,
}

/// One ranked hit from a similarity search: the catalog id and its cosine
/// similarity to the query vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredId {
    pub id: i64,
    pub score: f32,
}

impl FaqVectorStore {
    #[inline]
    pub async fn new(vectors_dir: &Path, dimension: usize) -> Result<Self, SentinelError> {
        debug!("Initializing LanceDB at path: {:?}", vectors_dir);

        std::fs::create_dir_all(vectors_dir).map_err(|e| {
            SentinelError::Database(format!("Failed to create vector database directory: {}", e))
        })?;

        let uri = format!("file://{}", vectors_dir.display());
        let connection = lancedb::connect(&uri).execute().await.map_err(|e| {
            SentinelError::Database(format!("Failed to connect to LanceDB: {}", e))
        })?;

        let store = Self {
            connection,
            table_name: TABLE_NAME.to_string(),
            dimension,
        };

        store.initialize_table().await?;

        info!("Vector store initialized successfully");
        Ok(store)
    }

    async fn initialize_table(&self) -> Result<(), SentinelError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| SentinelError::Database(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&self.table_name) {
            debug!("FAQ vector table already exists");
            return Ok(());
        }

        let schema = self.create_schema();
        self.connection
            .create_empty_table(&self.table_name, schema)
            .execute()
            .await
            .map_err(|e| SentinelError::Database(format!("Failed to create table: {}", e)))?;

        info!(
            "FAQ vector table created with {} dimensions",
            self.dimension
        );
        Ok(())
    }

    fn create_schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.dimension as i32,
                ),
                false,
            ),
        ]))
    }

    /// Replace the whole table with a fresh set of vectors. The catalog is
    /// small and rebuilt wholesale, mirroring the metadata table.
    #[inline]
    pub async fn rebuild(&self, records: &[FaqVector]) -> Result<(), SentinelError> {
        debug!("Rebuilding vector table with {} records", records.len());

        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| SentinelError::Database(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&self.table_name) {
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| SentinelError::Database(format!("Failed to drop table: {}", e)))?;
        }

        let schema = self.create_schema();
        self.connection
            .create_empty_table(&self.table_name, Arc::clone(&schema))
            .execute()
            .await
            .map_err(|e| SentinelError::Database(format!("Failed to create table: {}", e)))?;

        if records.is_empty() {
            return Ok(());
        }

        let record_batch = self.create_record_batch(records)?;
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| SentinelError::Database(format!("Failed to open table: {}", e)))?;

        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| SentinelError::Database(format!("Failed to insert vectors: {}", e)))?;

        info!("Stored {} FAQ vectors", records.len());
        Ok(())
    }

    fn create_record_batch(&self, records: &[FaqVector]) -> Result<RecordBatch, SentinelError> {
        let len = records.len();

        let mut ids = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * self.dimension);

        for record in records {
            if record.vector.len() != self.dimension {
                return Err(SentinelError::Database(format!(
                    "Vector for id {} has dimension {} but the table expects {}",
                    record.id,
                    record.vector.len(),
                    self.dimension
                )));
            }
            ids.push(record.id);
            flat_values.extend_from_slice(&record.vector);
        }

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            self.dimension as i32,
            Arc::new(values_array),
            None,
        )
        .map_err(|e| SentinelError::Database(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> =
            vec![Arc::new(Int64Array::from(ids)), Arc::new(vector_array)];

        RecordBatch::try_new(self.create_schema(), arrays)
            .map_err(|e| SentinelError::Database(format!("Failed to create record batch: {}", e)))
    }

    /// Search for the nearest FAQ vectors by cosine distance. Query vectors
    /// must be L2-normalized so the returned score is the cosine similarity
    /// (similarity = 1 − cosine distance).
    #[inline]
    pub async fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredId>, SentinelError> {
        debug!("Searching for similar vectors with limit: {}", limit);

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| SentinelError::Database(format!("Failed to open table: {}", e)))?;

        let results = table
            .vector_search(query_vector)
            .map_err(|e| {
                SentinelError::Database(format!("Failed to create vector search: {}", e))
            })?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| SentinelError::Database(format!("Failed to execute search: {}", e)))?;

        self.parse_search_results_stream(results).await
    }

    async fn parse_search_results_stream(
        &self,
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<ScoredId>, SentinelError> {
        let mut search_results = Vec::new();

        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| SentinelError::Database(format!("Failed to read result stream: {}", e)))?
        {
            search_results.extend(self.parse_search_batch(&batch)?);
        }

        debug!("Parsed {} search results from stream", search_results.len());
        Ok(search_results)
    }

    fn parse_search_batch(&self, batch: &RecordBatch) -> Result<Vec<ScoredId>, SentinelError> {
        let ids = batch
            .column_by_name("id")
            .ok_or_else(|| SentinelError::Database("Missing id column".to_string()))?
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| SentinelError::Database("Invalid id column type".to_string()))?;

        let distances = batch
            .column_by_name("_distance")
            .map(|col| col.as_any().downcast_ref::<Float32Array>());

        let mut search_results = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let distance = distances
                .flatten()
                .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

            // Cosine distance is 1 − cosine similarity
            search_results.push(ScoredId {
                id: ids.value(row),
                score: 1.0 - distance,
            });
        }

        Ok(search_results)
    }

    /// Get the total number of stored vectors
    #[inline]
    pub async fn count(&self) -> Result<u64, SentinelError> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| SentinelError::Database(format!("Failed to open table: {}", e)))?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| SentinelError::Database(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    /// List every stored catalog id, sorted ascending
    #[inline]
    pub async fn list_ids(&self) -> Result<Vec<i64>, SentinelError> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| SentinelError::Database(format!("Failed to open table: {}", e)))?;

        let mut stream = table
            .query()
            .execute()
            .await
            .map_err(|e| SentinelError::Database(format!("Failed to scan table: {}", e)))?;

        let mut ids = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| SentinelError::Database(format!("Failed to read scan stream: {}", e)))?
        {
            let column = batch
                .column_by_name("id")
                .ok_or_else(|| SentinelError::Database("Missing id column".to_string()))?
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| SentinelError::Database("Invalid id column type".to_string()))?;
            ids.extend(column.values().iter().copied());
        }

        ids.sort_unstable();
        Ok(ids)
    }
}
