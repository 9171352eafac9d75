use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    /// Filter or extraction rule does not fit the event schema of the source.
    #[error("schema mismatch for {source_label}: {reason}")]
    SchemaMismatch { source_label: String, reason: String },
    #[error("source {source_label} unreachable: {reason}")]
    SourceUnreachable { source_label: String, reason: String },
    #[error("aggregation incomplete, source {source_label} failed")]
    AggregationIncomplete {
        source_label: String,
        #[source]
        cause: Box<ScanError>,
    },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl ScanError {
    pub fn schema_mismatch(source_label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaMismatch { source_label: source_label.into(), reason: reason.into() }
    }

    pub fn unreachable(source_label: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnreachable { source_label: source_label.into(), reason: reason.to_string() }
    }

    /// Wrap a per-source failure so the caller sees the whole call as failed.
    /// Schema mismatches are configuration bugs and pass through unchanged.
    pub fn into_incomplete(self) -> Self {
        if let Self::SourceUnreachable { source_label, .. } = &self {
            let source_label = source_label.clone();
            return Self::AggregationIncomplete { source_label, cause: Box::new(self) };
        }
        self
    }
}
