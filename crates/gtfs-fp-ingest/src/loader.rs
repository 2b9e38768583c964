//! DuckDB loading of the extracted timetable files
//!
//! Tables are declared as data ([`TableSpec`], [`IndexSpec`]) and rendered to
//! `CREATE TABLE ... AS SELECT * FROM read_csv(...)` statements. Statements run
//! one by one; the first failure stops the load and names the table or index.

use duckdb::Connection;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use crate::error::{FilesystemError, LoadError};

/// Only station-level stops (`Parent8500010`, ...) are kept
pub const STATION_STOP_PREFIX: &str = "Parent";

/// Rows kept only when `column` starts with `prefix`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixFilter {
    pub column: &'static str,
    pub prefix: &'static str,
}

/// How one extracted file becomes one table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub source_file: &'static str,
    /// Columns whose empty values stay `''` instead of becoming NULL
    pub force_not_null: &'static [&'static str],
    /// Explicit column types overriding inference
    pub pinned_types: &'static [(&'static str, &'static str)],
    pub prefix_filter: Option<PrefixFilter>,
}

pub const TABLES: [TableSpec; 4] = [
    TableSpec {
        name: "stops",
        source_file: "stops.txt",
        force_not_null: &["location_type", "parent_station", "platform_code"],
        pinned_types: &[],
        prefix_filter: Some(PrefixFilter {
            column: "stop_id",
            prefix: STATION_STOP_PREFIX,
        }),
    },
    TableSpec {
        name: "trips",
        source_file: "trips.txt",
        force_not_null: &["block_id", "original_trip_id", "hints"],
        // Numeric-looking block ids lose leading zeros when inferred
        pinned_types: &[("block_id", "VARCHAR")],
        prefix_filter: None,
    },
    TableSpec {
        name: "routes",
        source_file: "routes.txt",
        force_not_null: &["route_long_name"],
        pinned_types: &[],
        prefix_filter: None,
    },
    TableSpec {
        name: "stop_times",
        source_file: "stop_times.txt",
        force_not_null: &[],
        pinned_types: &[],
        prefix_filter: None,
    },
];

/// Secondary index on a join key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: &'static str,
    pub table: &'static str,
    pub column: &'static str,
}

pub const INDEXES: [IndexSpec; 4] = [
    IndexSpec {
        name: "route_id",
        table: "routes",
        column: "route_id",
    },
    IndexSpec {
        name: "trip_id",
        table: "trips",
        column: "trip_id",
    },
    IndexSpec {
        name: "stop_id",
        table: "stops",
        column: "stop_id",
    },
    IndexSpec {
        name: "stop_times_trip_id",
        table: "stop_times",
        column: "trip_id",
    },
];

impl TableSpec {
    /// Effective `read_csv` types.
    ///
    /// Forced-present and filter columns are read as VARCHAR: DuckDB cannot
    /// keep an empty value in a non-text column, and `starts_with` needs text.
    pub fn column_types(&self) -> Vec<(&'static str, &'static str)> {
        let mut types: Vec<(&'static str, &'static str)> = self.pinned_types.to_vec();
        let text_columns = self
            .force_not_null
            .iter()
            .copied()
            .chain(self.prefix_filter.map(|filter| filter.column));

        for column in text_columns {
            if !types.iter().any(|(name, _)| *name == column) {
                types.push((column, "VARCHAR"));
            }
        }
        types
    }

    pub fn create_statement(&self, source_dir: &Path) -> String {
        let source = source_dir.join(self.source_file);
        let mut options = vec![sql_literal(&source.to_string_lossy())];

        if !self.force_not_null.is_empty() {
            let columns: Vec<String> = self.force_not_null.iter().map(|c| sql_literal(c)).collect();
            options.push(format!("force_not_null = [{}]", columns.join(", ")));
        }

        let types = self.column_types();
        if !types.is_empty() {
            let entries: Vec<String> = types
                .iter()
                .map(|(column, ty)| format!("{}: {}", sql_literal(column), sql_literal(ty)))
                .collect();
            options.push(format!("types = {{{}}}", entries.join(", ")));
        }

        let mut sql = format!(
            "CREATE TABLE {} AS SELECT * FROM read_csv({})",
            self.name,
            options.join(", ")
        );
        if let Some(filter) = self.prefix_filter {
            sql.push_str(&format!(
                " WHERE starts_with({}, {})",
                filter.column,
                sql_literal(filter.prefix)
            ));
        }
        sql.push(';');
        sql
    }
}

impl IndexSpec {
    pub fn create_statement(&self) -> String {
        format!("CREATE INDEX {} ON {} ({});", self.name, self.table, self.column)
    }
}

fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLoad {
    pub name: String,
    pub rows: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub database_path: PathBuf,
    pub tables: Vec<TableLoad>,
}

/// Delete a database (and its WAL) left behind by an interrupted run.
///
/// Returns whether anything was removed.
pub fn remove_stale_database(path: &Path) -> Result<bool, FilesystemError> {
    let mut wal = path.as_os_str().to_owned();
    wal.push(".wal");

    let mut removed = false;
    for candidate in [path.to_path_buf(), PathBuf::from(wal)] {
        match std::fs::remove_file(&candidate) {
            Ok(()) => {
                warn!(path = %candidate.display(), "Removed stale database file");
                removed = true;
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {},
            Err(source) => {
                return Err(FilesystemError::RemoveStaleDatabase {
                    path: candidate,
                    source,
                })
            },
        }
    }
    Ok(removed)
}

pub struct AnalyticalLoader {
    database_path: PathBuf,
}

impl AnalyticalLoader {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
        }
    }

    /// Load every table from `source_dir`, build the indexes, close the file
    #[instrument(skip(self), fields(database = %self.database_path.display()))]
    pub fn load(&self, source_dir: &Path) -> Result<LoadReport, LoadError> {
        let conn = Connection::open(&self.database_path).map_err(|source| LoadError::Open {
            path: self.database_path.clone(),
            source,
        })?;

        let mut tables = Vec::with_capacity(TABLES.len());

        for table in &TABLES {
            let sql = table.create_statement(source_dir);
            debug!(table = table.name, %sql, "Loading table");

            let target = format!("table {}", table.name);
            conn.execute_batch(&sql)
                .map_err(|source| LoadError::Statement {
                    target: target.clone(),
                    source,
                })?;

            let rows: i64 = conn
                .query_row(&format!("SELECT count(*) FROM {}", table.name), [], |row| {
                    row.get(0)
                })
                .map_err(|source| LoadError::Statement { target, source })?;

            info!(table = table.name, rows, "Loaded table");
            tables.push(TableLoad {
                name: table.name.to_string(),
                rows: rows.max(0) as u64,
            });
        }

        for index in &INDEXES {
            conn.execute_batch(&index.create_statement())
                .map_err(|source| LoadError::Statement {
                    target: format!("index {}", index.name),
                    source,
                })?;
            debug!(index = index.name, table = index.table, "Created index");
        }

        conn.close().map_err(|(_, source)| LoadError::Close {
            path: self.database_path.clone(),
            source,
        })?;

        Ok(LoadReport {
            database_path: self.database_path.clone(),
            tables,
        })
    }
}
