//! MySQL adapter.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::mysql::{MySql, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, ConnectOptions, Connection, Executor, Row, TypeInfo};
use tokio::sync::Mutex;

use common::errors::{AppError, AppResult};
use common::models::connection::ConnectionParams;
use common::models::query::{ColumnInfo, FieldInfo, QueryOutput};

use super::{returns_rows, DatabaseAdapter};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// One live MySQL connection built from saved parameters.
pub struct MySqlAdapter {
    params: ConnectionParams,
    conn: Mutex<Option<MySqlConnection>>,
}

impl MySqlAdapter {
    pub fn new(params: ConnectionParams) -> Self {
        Self {
            params,
            conn: Mutex::new(None),
        }
    }

    fn connect_options(&self) -> AppResult<MySqlConnectOptions> {
        let host = self
            .params
            .host
            .as_deref()
            .ok_or_else(|| AppError::Validation("MySQL requires host".to_string()))?;

        let mut opts = MySqlConnectOptions::new()
            .host(host)
            .port(self.params.port.unwrap_or(3306))
            .username(self.params.username.as_deref().unwrap_or("root"));

        if let Some(password) = self.params.password.as_deref() {
            opts = opts.password(password);
        }
        if let Some(database) = self.params.database.as_deref() {
            let database = database.trim();
            if !database.is_empty() {
                opts = opts.database(database);
            }
        }

        Ok(opts)
    }

    /// Opens a throwaway connection and runs `SELECT 1`.
    async fn probe(&self) -> bool {
        let Ok(opts) = self.connect_options() else {
            return false;
        };
        let Ok(mut conn) = opts.connect().await else {
            return false;
        };
        let alive = sqlx::query("SELECT 1").execute(&mut conn).await.is_ok();
        let _ = conn.close().await;
        alive
    }

    fn bind_value<'q>(
        query: sqlx::query::Query<'q, MySql, sqlx::mysql::MySqlArguments>,
        value: &'q Value,
    ) -> sqlx::query::Query<'q, MySql, sqlx::mysql::MySqlArguments> {
        match value {
            Value::Null => query.bind(Option::<String>::None),
            Value::Bool(b) => query.bind(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    query.bind(i)
                } else {
                    query.bind(n.as_f64())
                }
            }
            Value::String(s) => query.bind(s.as_str()),
            // Objects and arrays travel as their JSON text.
            other => query.bind(other.to_string()),
        }
    }

    /// Decodes one cell to JSON, trying concrete types in order.
    ///
    /// `u64` goes first so `BIGINT UNSIGNED` columns decode without
    /// overflow; text and temporal types come after the numerics.
    fn extract_value(row: &MySqlRow, idx: usize) -> Value {
        if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
            return v.map(Value::from).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            return v.map(Value::from).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
            return v.map(Value::from).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<u32>, _>(idx) {
            return v.map(Value::from).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
            return v.map(Value::from).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<u16>, _>(idx) {
            return v.map(Value::from).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i8>, _>(idx) {
            return v.map(Value::from).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<u8>, _>(idx) {
            return v.map(Value::from).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
            return v.map(Value::from).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
            return v.map(Value::from).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
            return v.map(Value::from).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
            return v.map(Value::from).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
            return v
                .map(|dt| Value::from(dt.to_rfc3339()))
                .unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
            return v
                .map(|dt| Value::from(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
                .unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
            return v
                .map(|d| Value::from(d.format("%Y-%m-%d").to_string()))
                .unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::NaiveTime>, _>(idx) {
            return v
                .map(|t| Value::from(t.format("%H:%M:%S").to_string()))
                .unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
            return v
                .map(|b| Value::from(String::from_utf8_lossy(&b).into_owned()))
                .unwrap_or(Value::Null);
        }
        Value::Null
    }

    fn convert_row(row: &MySqlRow) -> Value {
        let mut object = Map::new();
        for column in row.columns() {
            object.insert(
                column.name().to_string(),
                Self::extract_value(row, column.ordinal()),
            );
        }
        Value::Object(object)
    }

    fn field_info(row: &MySqlRow) -> Vec<FieldInfo> {
        row.columns()
            .iter()
            .map(|col| FieldInfo {
                name: col.name().to_string(),
                data_type: col.type_info().name().to_string(),
            })
            .collect()
    }
}

#[async_trait]
impl DatabaseAdapter for MySqlAdapter {
    async fn connect(&self) -> AppResult<()> {
        let conn = self
            .connect_options()?
            .connect()
            .await
            .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
        *self.conn.lock().await = Some(conn);
        Ok(())
    }

    async fn query(&self, sql: &str, params: &[Value]) -> AppResult<QueryOutput> {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| AppError::DatabaseConnection("connection not open".to_string()))?;

        if returns_rows(sql) {
            let mut query = sqlx::query(sql);
            for param in params {
                query = Self::bind_value(query, param);
            }
            let rows: Vec<MySqlRow> = query
                .fetch_all(&mut *conn)
                .await
                .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;

            let fields = rows.first().map(Self::field_info).unwrap_or_default();
            let rows: Vec<Value> = rows.iter().map(Self::convert_row).collect();
            let row_count = rows.len();
            Ok(QueryOutput {
                rows,
                fields,
                row_count,
                affected_rows: None,
                last_insert_id: None,
            })
        } else {
            // The simple protocol covers DDL that some server versions
            // refuse to prepare; parameters force the prepared path.
            let result = if params.is_empty() {
                conn.execute(sqlx::raw_sql(sql))
                    .await
                    .map_err(|e| AppError::DatabaseQuery(e.to_string()))?
            } else {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = Self::bind_value(query, param);
                }
                query
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| AppError::DatabaseQuery(e.to_string()))?
            };

            let affected = result.rows_affected();
            let insert_id = result.last_insert_id();
            Ok(QueryOutput {
                rows: Vec::new(),
                fields: Vec::new(),
                row_count: affected as usize,
                affected_rows: Some(affected),
                last_insert_id: (insert_id != 0).then_some(insert_id),
            })
        }
    }

    async fn test_connection(&self) -> bool {
        tokio::time::timeout(PROBE_TIMEOUT, self.probe())
            .await
            .unwrap_or(false)
    }

    async fn list_tables(&self) -> AppResult<Vec<String>> {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| AppError::DatabaseConnection("connection not open".to_string()))?;

        let rows: Vec<MySqlRow> = sqlx::query("SHOW TABLES")
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>(0)
                    .map_err(|e| AppError::DatabaseQuery(e.to_string()))
            })
            .collect()
    }

    async fn table_structure(&self, table: &str) -> AppResult<Vec<ColumnInfo>> {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| AppError::DatabaseConnection("connection not open".to_string()))?;

        // CAST to CHAR avoids BINARY type mismatches when decoding.
        let rows: Vec<(String, String, String, Option<String>, String, String)> = sqlx::query_as(
            r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR) AS column_name,
                CAST(COLUMN_TYPE AS CHAR) AS column_type,
                CAST(IS_NULLABLE AS CHAR) AS is_nullable,
                CAST(COLUMN_DEFAULT AS CHAR) AS column_default,
                CAST(COLUMN_KEY AS CHAR) AS column_key,
                CAST(EXTRA AS CHAR) AS extra
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
            "#,
        )
        .bind(table)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(
                |(name, data_type, is_nullable, default_value, key, extra)| ColumnInfo {
                    name,
                    data_type,
                    nullable: is_nullable == "YES",
                    key: Some(key),
                    default_value,
                    extra: Some(extra),
                },
            )
            .collect())
    }

    async fn end(&self) -> AppResult<()> {
        if let Some(conn) = self.conn.lock().await.take() {
            conn.close()
                .await
                .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
        }
        Ok(())
    }
}
