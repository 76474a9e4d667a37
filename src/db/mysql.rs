use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, Connection, Row, TypeInfo};
use tracing::{debug, warn};

use super::{DataError, Executor, Param, Query, Table, Value};

/// [`Executor`] backed by MySQL.
///
/// Every call opens its own connection and closes it before returning,
/// whether or not the query succeeded.
pub struct MySqlExecutor {
    options: MySqlConnectOptions,
}

impl MySqlExecutor {
    pub fn new(options: MySqlConnectOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Executor for MySqlExecutor {
    #[tracing::instrument(skip_all)]
    async fn execute(&self, query: &Query) -> Result<Table, DataError> {
        let (sql, params) = query.bind_positional()?;

        let mut conn = MySqlConnection::connect_with(&self.options)
            .await
            .map_err(|e| DataError::Connection(e.to_string()))?;

        let result = fetch_table(&mut conn, &sql, params).await;

        if let Err(e) = conn.close().await {
            warn!(error = %e, "Failed to close MySQL connection cleanly");
        }

        if let Ok(table) = &result {
            debug!(rows = table.len(), "Query complete");
        }
        result
    }
}

async fn fetch_table(
    conn: &mut MySqlConnection,
    sql: &str,
    params: Vec<Param>,
) -> Result<Table, DataError> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = match param {
            Param::Int(v) => query.bind(v),
            Param::Text(v) => query.bind(v),
            Param::Date(v) => query.bind(v),
        };
    }

    let rows = query.fetch_all(&mut *conn).await?;

    let columns = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();
    let mut table = Table::new(columns);

    for row in &rows {
        let cells = (0..row.len())
            .map(|idx| decode_cell(row, idx))
            .collect::<Result<Vec<_>, _>>()?;
        table.push_row(cells);
    }

    Ok(table)
}

fn decode_cell(row: &MySqlRow, idx: usize) -> Result<Value, DataError> {
    let column = &row.columns()[idx];
    let type_name = column.type_info().name();

    let value = match type_name {
        "NULL" => None,
        "BOOLEAN" => row
            .try_get::<Option<bool>, _>(idx)?
            .map(|b| Value::Int(i64::from(b))),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            row.try_get::<Option<i64>, _>(idx)?.map(Value::Int)
        }
        name if name.ends_with("UNSIGNED") => match row.try_get::<Option<u64>, _>(idx)? {
            Some(v) => Some(Value::Int(i64::try_from(v).map_err(|_| {
                DataError::decode(column.name(), "unsigned value out of range")
            })?)),
            None => None,
        },
        "FLOAT" => row
            .try_get::<Option<f32>, _>(idx)?
            .map(|v| Value::Float(f64::from(v))),
        "DOUBLE" => row.try_get::<Option<f64>, _>(idx)?.map(Value::Float),
        "DATE" => row.try_get::<Option<chrono::NaiveDate>, _>(idx)?.map(Value::Date),
        "DATETIME" | "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(idx)?
            .map(Value::DateTime),
        "DECIMAL" => {
            return Err(DataError::decode(
                column.name(),
                "DECIMAL columns must be CAST to SIGNED or DOUBLE in the query",
            ));
        }
        _ => row.try_get::<Option<String>, _>(idx)?.map(Value::Text),
    };

    Ok(value.unwrap_or(Value::Null))
}
