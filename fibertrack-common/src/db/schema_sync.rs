//! Automatic schema synchronization
//!
//! Fault sheets grew columns over time (escort status, OTDR readings, ...).
//! Databases created before a column existed get it added on startup, so the
//! schema definition in code stays the single source of truth.
//!
//! What sync can fix: missing nullable columns (`ALTER TABLE ADD COLUMN`).
//! What it only reports: type or constraint drift, which needs a manual
//! migration in `migrations.rs`.

use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

/// Expected column with its SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    /// SQL type ("TEXT", "INTEGER", "TIMESTAMP", ...)
    pub sql_type: String,
    pub not_null: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            unique: false,
            default_value: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// SQL literal used as DEFAULT (quote strings yourself: `"''"`)
    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// Column as reported by `PRAGMA table_info`
#[derive(Debug, Clone)]
pub struct ActualColumn {
    pub cid: i32,
    pub name: String,
    pub type_name: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub pk: bool,
}

/// Difference between the expected and the actual table
#[derive(Debug, Clone)]
pub enum SchemaDrift {
    MissingColumn {
        table: String,
        column: ColumnDefinition,
    },
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        actual: String,
    },
    ConstraintMismatch {
        table: String,
        column: String,
        constraint: String,
    },
}

/// Declarative definition of one table
pub trait TableSchema {
    fn table_name() -> &'static str;

    /// Expected columns, in creation order
    fn expected_columns() -> Vec<ColumnDefinition>;
}

/// Reads the live schema
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Columns of `table_name` ordered by cid
    pub async fn introspect_table(pool: &SqlitePool, table_name: &str) -> Result<Vec<ActualColumn>> {
        let rows = sqlx::query(&format!("PRAGMA table_info({})", table_name))
            .fetch_all(pool)
            .await?;

        let mut columns = rows
            .iter()
            .map(|row| ActualColumn {
                cid: row.get("cid"),
                name: row.get("name"),
                type_name: row.get("type"),
                not_null: row.get::<i32, _>("notnull") != 0,
                default_value: row.get("dflt_value"),
                pk: row.get::<i32, _>("pk") != 0,
            })
            .collect::<Vec<_>>();
        columns.sort_by_key(|c| c.cid);

        Ok(columns)
    }

    pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
        )
        .bind(table_name)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }
}

/// Compares expected against actual columns
pub struct SchemaDiff;

impl SchemaDiff {
    pub fn compare(
        table_name: &str,
        expected: &[ColumnDefinition],
        actual: &[ActualColumn],
    ) -> Vec<SchemaDrift> {
        let mut drift = Vec::new();

        for want in expected {
            let Some(have) = actual.iter().find(|c| c.name == want.name) else {
                drift.push(SchemaDrift::MissingColumn {
                    table: table_name.to_string(),
                    column: want.clone(),
                });
                continue;
            };

            if !Self::types_compatible(&want.sql_type, &have.type_name) {
                drift.push(SchemaDrift::TypeMismatch {
                    table: table_name.to_string(),
                    column: want.name.clone(),
                    expected: want.sql_type.clone(),
                    actual: have.type_name.clone(),
                });
            }

            if want.not_null && !have.not_null && !have.pk {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: want.name.clone(),
                    constraint: "NOT NULL".to_string(),
                });
            }

            if want.primary_key && !have.pk {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: want.name.clone(),
                    constraint: "PRIMARY KEY".to_string(),
                });
            }
        }

        drift
    }

    /// SQLite affinity comparison. The Flask-era schema used VARCHAR(n) and
    /// DATETIME, which must match TEXT and TIMESTAMP.
    fn types_compatible(expected: &str, actual: &str) -> bool {
        let exp = Self::affinity(expected);
        exp == Self::affinity(actual)
    }

    fn affinity(sql_type: &str) -> &'static str {
        let t = sql_type.to_uppercase();
        if t.contains("INT") {
            "INTEGER"
        } else if t.contains("CHAR") || t.contains("CLOB") || t.contains("TEXT") {
            "TEXT"
        } else if t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB") {
            "REAL"
        } else if t.contains("TIME") || t.contains("DATE") {
            "DATETIME"
        } else if t.contains("BOOL") {
            "INTEGER"
        } else {
            "NUMERIC"
        }
    }
}

/// Applies drift fixes
pub struct SchemaSync;

impl SchemaSync {
    /// Add missing columns of `T`, report anything that needs a manual migration
    pub async fn sync_table<T: TableSchema>(pool: &SqlitePool) -> Result<usize> {
        let table_name = T::table_name();

        if !SchemaIntrospector::table_exists(pool, table_name).await? {
            warn!("Schema sync: table '{}' does not exist yet", table_name);
            return Ok(0);
        }

        let actual = SchemaIntrospector::introspect_table(pool, table_name).await?;
        let drift = SchemaDiff::compare(table_name, &T::expected_columns(), &actual);

        if drift.is_empty() {
            debug!("Schema sync: '{}' up to date", table_name);
            return Ok(0);
        }

        let mut added = 0;
        for change in drift {
            match change {
                SchemaDrift::MissingColumn { table, column } => {
                    Self::add_column(pool, &table, &column).await?;
                    added += 1;
                }
                SchemaDrift::TypeMismatch { table, column, expected, actual } => {
                    warn!(
                        "Type mismatch in {}.{}: expected '{}', found '{}'. Manual migration required.",
                        table, column, expected, actual
                    );
                }
                SchemaDrift::ConstraintMismatch { table, column, constraint } => {
                    warn!(
                        "Constraint mismatch in {}.{}: missing '{}'. Manual migration required.",
                        table, column, constraint
                    );
                }
            }
        }

        Ok(added)
    }

    /// `ALTER TABLE ADD COLUMN`, within SQLite's limits: no PRIMARY KEY or
    /// UNIQUE, and NOT NULL only with a default.
    async fn add_column(pool: &SqlitePool, table: &str, column: &ColumnDefinition) -> Result<()> {
        let mut sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column.name, column.sql_type);

        if column.primary_key || column.unique {
            warn!(
                "Cannot add key/unique column {}.{} via ALTER TABLE; adding without the constraint",
                table, column.name
            );
        }

        // ADD COLUMN rejects CURRENT_TIMESTAMP and friends as a default
        let default = match column.default_value.as_deref() {
            Some(d) if d.trim().to_uppercase().starts_with("CURRENT_") => {
                warn!(
                    "Cannot add {}.{} with non-constant default {}; adding without default",
                    table, column.name, d
                );
                None
            }
            other => other,
        };

        match (default, column.not_null) {
            (Some(default), true) => sql.push_str(&format!(" NOT NULL DEFAULT {}", default)),
            (Some(default), false) => sql.push_str(&format!(" DEFAULT {}", default)),
            (None, true) => warn!(
                "Cannot add NOT NULL column {}.{} without a default; adding as nullable",
                table, column.name
            ),
            (None, false) => {}
        }

        match sqlx::query(&sql).execute(pool).await {
            Ok(_) => {
                info!("Added column {}.{} ({})", table, column.name, column.sql_type);
                Ok(())
            }
            // Another process initialized the same database concurrently
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
