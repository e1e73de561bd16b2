// file: src/etl/warehouse.rs
// description: warehouse loader trait with full-replace semantics
// reference: bulk copy of a staged flat file into a named table

use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::info;

/// Bulk loader into a named warehouse table. Every load replaces the
/// table's prior contents with the new batch; there is no incremental
/// merge and no dedup across batches.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Parse `csv_bytes` and replace the contents of `table` with its rows.
    /// Returns the number of rows loaded. `skip_header` drops the first
    /// record before loading.
    async fn load_replace(&self, table: &str, csv_bytes: &[u8], skip_header: bool)
    -> Result<usize>;

    async fn row_count(&self, table: &str) -> Result<usize>;
}

/// In-process warehouse keeping parsed CSV rows per table. Stands in for
/// an external warehouse behind the same trait.
#[derive(Default)]
pub struct CsvWarehouse {
    tables: RwLock<HashMap<String, Vec<Vec<String>>>>,
}

impl CsvWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self, table: &str) -> Vec<Vec<String>> {
        let tables = self.tables.read().expect("warehouse lock poisoned");
        tables.get(table).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Warehouse for CsvWarehouse {
    async fn load_replace(
        &self,
        table: &str,
        csv_bytes: &[u8],
        skip_header: bool,
    ) -> Result<usize> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(skip_header)
            .flexible(true)
            .from_reader(csv_bytes);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| PipelineError::load(table, format!("bad csv record: {}", e)))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        let loaded = rows.len();
        let mut tables = self.tables.write().expect("warehouse lock poisoned");
        tables.insert(table.to_string(), rows);

        info!("Loaded {} row(s) into {} (full replace)", loaded, table);
        Ok(loaded)
    }

    async fn row_count(&self, table: &str) -> Result<usize> {
        let tables = self.tables.read().expect("warehouse lock poisoned");
        Ok(tables.get(table).map_or(0, Vec::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_load_skips_header_row() {
        let warehouse = CsvWarehouse::new();
        let loaded = warehouse
            .load_replace("listings", b"price,beds\n100,2\n200,3\n", true)
            .await
            .unwrap();

        assert_eq!(loaded, 2);
        assert_eq!(
            warehouse.rows("listings"),
            vec![vec!["100", "2"], vec!["200", "3"]]
        );
    }

    #[tokio::test]
    async fn test_second_load_fully_replaces_first() {
        let warehouse = CsvWarehouse::new();
        warehouse
            .load_replace("listings", b"price,beds\n100,2\n200,3\n", true)
            .await
            .unwrap();
        warehouse
            .load_replace("listings", b"price,beds\n900,5\n", true)
            .await
            .unwrap();

        // Only the second batch's rows survive.
        assert_eq!(warehouse.rows("listings"), vec![vec!["900", "5"]]);
        assert_eq!(warehouse.row_count("listings").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_non_utf8_csv_is_load_error() {
        let warehouse = CsvWarehouse::new();
        let err = warehouse
            .load_replace("listings", b"price,beds\n\xFF\xFE,2\n", true)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Load { .. }));
    }

    #[tokio::test]
    async fn test_row_count_of_unknown_table_is_zero() {
        let warehouse = CsvWarehouse::new();
        assert_eq!(warehouse.row_count("nothing").await.unwrap(), 0);
    }
}
