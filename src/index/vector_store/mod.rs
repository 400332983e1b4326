
use super::{ChunkMetadata, EmbeddingRecord};
use crate::{PdfQaError, config::Config};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_VECTOR_DIMENSION: usize = 768;

/// Vector database store using LanceDB for similarity search
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    vector_dimension: Option<usize>,
}

/// Search result from vector similarity search
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub metadata: ChunkMetadata,
    pub similarity_score: f32,
    pub distance: f32,
}

impl VectorStore {
    /// Open (or create) the vector store at the configured path
    #[inline]
    pub async fn open(config: &Config) -> Result<Self, PdfQaError> {
        let db_path = config.vector_database_path();
        debug!("Initializing LanceDB at path: {:?}", db_path);

        // Ensure the backing storage directory exists
        std::fs::create_dir_all(&db_path).map_err(|e| {
            PdfQaError::Index(format!("Failed to create vector database directory: {}", e))
        })?;

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| PdfQaError::Index(format!("Failed to connect to LanceDB: {}", e)))?;

        let mut store = Self {
            connection,
            table_name: "embeddings".to_string(),
            vector_dimension: None,
        };

        store.initialize_table().await?;

        info!("Vector store initialized successfully");
        Ok(store)
    }

    /// Rebuild the index from scratch with the given records
    ///
    /// Drops any existing table, recreates it with the records' vector
    /// dimension, and inserts everything in one batch. The engine persists
    /// the table to its on-disk format as part of the insert.
    #[inline]
    pub async fn rebuild(config: &Config, records: Vec<EmbeddingRecord>) -> Result<Self, PdfQaError> {
        let mut store = Self::open(config).await?;

        store.drop_table_if_exists().await?;

        let vector_dim = records
            .first()
            .map_or(DEFAULT_VECTOR_DIMENSION, |r| r.vector.len());
        store.create_table_with_dimension(vector_dim).await?;
        store.vector_dimension = Some(vector_dim);

        store.store_embeddings_batch(records).await?;

        Ok(store)
    }

    /// Initialize the embeddings table with the correct schema
    async fn initialize_table(&mut self) -> Result<(), PdfQaError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| PdfQaError::Index(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&self.table_name) {
            let dim = self.detect_existing_vector_dimension().await?;
            debug!("Detected existing vector dimension: {}", dim);
            self.vector_dimension = Some(dim);
            return Ok(());
        }

        // Placeholder schema; recreated with the real dimension on rebuild
        self.create_table_with_dimension(DEFAULT_VECTOR_DIMENSION)
            .await?;
        self.vector_dimension = Some(DEFAULT_VECTOR_DIMENSION);
        Ok(())
    }

    /// Detect vector dimension from existing table schema
    async fn detect_existing_vector_dimension(&self) -> Result<usize, PdfQaError> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| PdfQaError::Index(format!("Failed to open existing table: {}", e)))?;

        let schema = table
            .schema()
            .await
            .map_err(|e| PdfQaError::Index(format!("Failed to get table schema: {}", e)))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(*size as usize);
                }
            }
        }

        Err(PdfQaError::Index(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }

    async fn create_table_with_dimension(&self, vector_dim: usize) -> Result<(), PdfQaError> {
        let schema = self.create_schema(vector_dim);
        self.connection
            .create_empty_table(&self.table_name, schema)
            .execute()
            .await
            .map_err(|e| PdfQaError::Index(format!("Failed to create table: {}", e)))?;

        debug!("Embeddings table created with {} dimensions", vector_dim);
        Ok(())
    }

    /// Create schema with the specified vector dimension
    fn create_schema(&self, vector_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    vector_dim as i32,
                ),
                false,
            ),
            Field::new("source", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("char_count", DataType::UInt32, false),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    /// Store multiple embeddings in a batch (append-only)
    #[inline]
    pub async fn store_embeddings_batch(
        &self,
        records: Vec<EmbeddingRecord>,
    ) -> Result<(), PdfQaError> {
        if records.is_empty() {
            debug!("No embeddings to store");
            return Ok(());
        }

        debug!("Storing batch of {} embeddings", records.len());

        let vector_dim = records[0].vector.len();
        if self.vector_dimension != Some(vector_dim) {
            return Err(PdfQaError::Index(format!(
                "Embedding dimension mismatch: table expects {:?}, batch has {}",
                self.vector_dimension, vector_dim
            )));
        }

        let record_batch = self.create_record_batch(&records)?;

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| PdfQaError::Index(format!("Failed to open table: {}", e)))?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| PdfQaError::Index(format!("Failed to insert embeddings: {}", e)))?;

        info!("Successfully stored {} embeddings", records.len());
        Ok(())
    }

    /// Create a RecordBatch from embedding records
    fn create_record_batch(&self, records: &[EmbeddingRecord]) -> Result<RecordBatch, PdfQaError> {
        let len = records.len();
        let vector_dim = self
            .vector_dimension
            .ok_or_else(|| PdfQaError::Index("Vector dimension not set".to_string()))?;

        let mut ids = Vec::with_capacity(len);
        let mut vectors = Vec::with_capacity(len);
        let mut sources = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut chunk_indices = Vec::with_capacity(len);
        let mut char_counts = Vec::with_capacity(len);
        let mut created_ats = Vec::with_capacity(len);

        for record in records {
            if record.vector.len() != vector_dim {
                return Err(PdfQaError::Index(format!(
                    "Embedding dimension mismatch within batch: expected {}, got {}",
                    vector_dim,
                    record.vector.len()
                )));
            }

            ids.push(record.id.as_str());
            vectors.push(record.vector.clone());
            sources.push(record.metadata.source.as_str());
            contents.push(record.metadata.content.as_str());
            chunk_indices.push(record.metadata.chunk_index);
            char_counts.push(record.metadata.char_count);
            created_ats.push(record.metadata.created_at.as_str());
        }

        let schema = self.create_schema(vector_dim);

        // Create vector array using FixedSizeListArray
        let mut flat_values = Vec::with_capacity(len * vector_dim);
        for vector in &vectors {
            flat_values.extend_from_slice(vector);
        }
        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array =
            FixedSizeListArray::try_new(field, vector_dim as i32, Arc::new(values_array), None)
                .map_err(|e| {
                    PdfQaError::Index(format!("Failed to create vector array: {}", e))
                })?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(sources)),
            Arc::new(StringArray::from(contents)),
            Arc::new(UInt32Array::from(chunk_indices)),
            Arc::new(UInt32Array::from(char_counts)),
            Arc::new(StringArray::from(created_ats)),
        ];

        RecordBatch::try_new(schema, arrays)
            .map_err(|e| PdfQaError::Index(format!("Failed to create record batch: {}", e)))
    }

    /// Search for similar embeddings using vector similarity
    #[inline]
    pub async fn search_similar(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>, PdfQaError> {
        debug!("Searching for similar vectors with limit: {}", limit);

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| PdfQaError::Index(format!("Failed to open table: {}", e)))?;

        let query = table
            .vector_search(query_vector)
            .map_err(|e| PdfQaError::Index(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(limit);

        let results = query
            .execute()
            .await
            .map_err(|e| PdfQaError::Index(format!("Failed to execute search: {}", e)))?;

        self.parse_search_results_stream(results).await
    }

    /// Parse search results from the LanceDB stream into SearchResult structs
    async fn parse_search_results_stream(
        &self,
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<SearchResult>, PdfQaError> {
        let mut search_results = Vec::new();

        while let Some(batch_result) = results
            .try_next()
            .await
            .map_err(|e| PdfQaError::Index(format!("Failed to read result stream: {}", e)))?
        {
            let parsed_batch = self.parse_search_batch(&batch_result)?;
            search_results.extend(parsed_batch);
        }

        debug!("Parsed {} search results from stream", search_results.len());
        Ok(search_results)
    }

    /// Parse a single record batch from search results
    fn parse_search_batch(&self, batch: &RecordBatch) -> Result<Vec<SearchResult>, PdfQaError> {
        let mut search_results = Vec::new();
        let num_rows = batch.num_rows();

        let sources = string_column(batch, "source")?;
        let contents = string_column(batch, "content")?;
        let created_ats = string_column(batch, "created_at")?;
        let chunk_indices = u32_column(batch, "chunk_index")?;
        let char_counts = u32_column(batch, "char_count")?;

        // Extract distance scores if available
        let distances = batch
            .column_by_name("_distance")
            .map(|col| col.as_any().downcast_ref::<Float32Array>());

        for row in 0..num_rows {
            let metadata = ChunkMetadata {
                source: sources.value(row).to_string(),
                content: contents.value(row).to_string(),
                chunk_index: chunk_indices.value(row),
                char_count: char_counts.value(row),
                created_at: created_ats.value(row).to_string(),
            };

            let distance = distances
                .flatten()
                .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

            // Convert distance to similarity score (higher is better)
            let similarity_score = 1.0 - distance;

            search_results.push(SearchResult {
                metadata,
                similarity_score,
                distance,
            });
        }

        debug!("Parsed {} search results", search_results.len());
        Ok(search_results)
    }

    /// Get the total number of embeddings stored
    #[inline]
    pub async fn count_embeddings(&self) -> Result<u64, PdfQaError> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| PdfQaError::Index(format!("Failed to open table: {}", e)))?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| PdfQaError::Index(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    /// Drop the embeddings table if it exists
    async fn drop_table_if_exists(&self) -> Result<(), PdfQaError> {
        let table_names =
            self.connection.table_names().execute().await.map_err(|e| {
                PdfQaError::Index(format!("Failed to list tables for drop: {}", e))
            })?;

        if table_names.contains(&self.table_name) {
            info!("Dropping existing embeddings table");
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| PdfQaError::Index(format!("Failed to drop table: {}", e)))?;
        }

        Ok(())
    }
}

fn string_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a StringArray, PdfQaError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| PdfQaError::Index(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| PdfQaError::Index(format!("Invalid {} column type", name)))
}

fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array, PdfQaError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| PdfQaError::Index(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| PdfQaError::Index(format!("Invalid {} column type", name)))
}
