/// Broad failure category. Each kind maps to a process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed date or field in an input record.
    Format,
    /// A required column is missing at the ingestion boundary.
    Schema,
    /// Too few rows or distinct values to fit or evaluate.
    InsufficientData,
    /// Invalid configuration or CLI usage.
    Config,
    /// Filesystem or serialization failure.
    Io,
    /// Numerical failure inside the model.
    Model,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Format | ErrorKind::Schema | ErrorKind::Config | ErrorKind::Io => 2,
            ErrorKind::InsufficientData => 3,
            ErrorKind::Model => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Format => "format error",
            ErrorKind::Schema => "schema error",
            ErrorKind::InsufficientData => "insufficient data",
            ErrorKind::Config => "config error",
            ErrorKind::Io => "io error",
            ErrorKind::Model => "model error",
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    row: Option<usize>,
    column: Option<String>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            row: None,
            column: None,
        }
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Format, message)
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Schema, message)
    }

    pub fn insufficient_data(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InsufficientData, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn model(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Model, message)
    }

    /// Attach the 1-based data row position of the offending record.
    pub fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    /// Attach the offending column name.
    pub fn in_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn row(&self) -> Option<usize> {
        self.row
    }

    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message)?;
        match (self.row, self.column.as_deref()) {
            (Some(row), Some(column)) => write!(f, " (row {row}, column `{column}`)"),
            (Some(row), None) => write!(f, " (row {row})"),
            (None, Some(column)) => write!(f, " (column `{column}`)"),
            (None, None) => Ok(()),
        }
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("exit_code", &self.exit_code())
            .field("message", &self.message)
            .field("row", &self.row)
            .field("column", &self.column)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_row_and_column_context() {
        let err = AppError::format("Invalid date '31/31/2025'")
            .at_row(7)
            .in_column("date");
        assert_eq!(
            err.to_string(),
            "format error: Invalid date '31/31/2025' (row 7, column `date`)"
        );
        assert_eq!(err.row(), Some(7));
        assert_eq!(err.column(), Some("date"));
    }

    #[test]
    fn exit_codes_follow_kind() {
        assert_eq!(AppError::schema("x").exit_code(), 2);
        assert_eq!(AppError::insufficient_data("x").exit_code(), 3);
        assert_eq!(AppError::model("x").exit_code(), 4);
        assert_eq!(AppError::io("x").kind(), ErrorKind::Io);
    }
}
