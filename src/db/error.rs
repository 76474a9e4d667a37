/// Failures surfaced by the data-access layer.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// The store could not be reached or the connection dropped.
    #[error("connection error: {0}")]
    Connection(String),

    /// The statement or its parameters were rejected.
    #[error("query error: {0}")]
    Query(String),

    /// A row did not have the shape the caller expected.
    #[error("decode error in column `{column}`: {message}")]
    Decode { column: String, message: String },
}

impl DataError {
    pub fn decode(column: &str, message: impl Into<String>) -> Self {
        DataError::Decode {
            column: column.to_string(),
            message: message.into(),
        }
    }

    /// `true` for errors caused by an unreachable store.
    pub fn is_connection(&self) -> bool {
        matches!(self, DataError::Connection(_))
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Configuration(_) => DataError::Connection(err.to_string()),
            sqlx::Error::ColumnDecode { index, source } => {
                DataError::decode(&index, source.to_string())
            }
            other => DataError::Query(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_map_to_connection() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: DataError = sqlx::Error::Io(io).into();
        assert!(err.is_connection());
    }

    #[test]
    fn test_row_not_found_maps_to_query() {
        let err: DataError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DataError::Query(_)));
    }

    #[test]
    fn test_decode_message_names_column() {
        let err = DataError::decode("speed", "expected integer");
        assert_eq!(
            err.to_string(),
            "decode error in column `speed`: expected integer"
        );
    }
}
