//! Columnar file I/O for the TCA workspace.
//!
//! This crate handles:
//! - Loading executions, reference data and quote ticks from parquet
//! - Writing scored trades to parquet
//!
//! Both directions go through an embedded DuckDB connection.

pub mod reader;
pub mod writer;

pub use reader::ParquetReader;
pub use writer::ParquetWriter;

use std::path::Path;

use tca_core::Error;

/// Convert a DuckDB error into the workspace error type.
pub(crate) fn db_err(e: duckdb::Error) -> Error {
    Error::database(e.to_string())
}

/// Render a path as a single-quoted SQL string literal.
pub(crate) fn sql_path(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', "''"))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use duckdb::Connection;

    use crate::sql_path;

    /// Materialize the result of `select` as a parquet file.
    pub fn write_parquet(path: &Path, select: &str) {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(&format!("COPY ({select}) TO {} (FORMAT PARQUET)", sql_path(path)))
            .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_path_escapes_quotes() {
        assert_eq!(sql_path(Path::new("/tmp/o'brien.parquet")), "'/tmp/o''brien.parquet'");
    }
}
