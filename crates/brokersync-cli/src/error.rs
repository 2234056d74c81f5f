use brokersync_core::IngestError;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] brokersync_core::ValidationError),

    #[error("[{code}] {source}", code = .0.code(), source = .0)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Ingest(IngestError::Config { .. }) => 2,
            Self::Ingest(IngestError::Auth { .. }) => 3,
            Self::Ingest(IngestError::Transport { .. } | IngestError::DeadlineExceeded { .. }) => 4,
            Self::Ingest(IngestError::MalformedSection { .. } | IngestError::Parse { .. }) => 5,
            Self::Ingest(IngestError::Io { .. }) => 10,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_categories_map_to_distinct_exit_codes() {
        assert_eq!(CliError::from(IngestError::auth("expired")).exit_code(), 3);
        assert_eq!(
            CliError::from(IngestError::transport("https://api.test", Some(500), "down")).exit_code(),
            4
        );
        assert_eq!(CliError::from(IngestError::malformed("cash", "missing")).exit_code(), 5);
        assert_eq!(CliError::from(IngestError::parse("Quantity", "bad")).exit_code(), 5);
        assert_eq!(
            CliError::from(brokersync_core::ValidationError::EmptyLookback).exit_code(),
            2
        );
        assert_eq!(
            CliError::from(IngestError::from(brokersync_core::ValidationError::EmptyWindow)).exit_code(),
            2
        );
    }

    #[test]
    fn ingest_errors_display_their_code() {
        let error = CliError::from(IngestError::auth("expired"));
        assert_eq!(error.to_string(), "[auth.invalid_token] authentication failed: expired");
    }
}
