use thiserror::Error;

/// Invariant violations raised by the canonical domain constructors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol contains whitespace: '{value}'")]
    SymbolWhitespace { value: String },

    #[error("invalid institution '{value}', expected one of questrade, rbcdi")]
    InvalidInstitution { value: String },
    #[error("account number cannot be empty")]
    EmptyAccountNumber,

    #[error("currency must be a 3-letter uppercase ISO code: '{value}'")]
    InvalidCurrency { value: String },
    #[error("no exchange suffix is known for currency '{value}'")]
    UnsupportedCurrency { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },

    #[error("timestamp must be RFC3339: '{value}'")]
    InvalidTimestamp { value: String },
    #[error("date must look like 'Jan 1 2023': '{value}'")]
    InvalidTextDate { value: String },

    #[error("lookback must cover at least one window")]
    EmptyLookback,
    #[error("window length must be at least one day")]
    EmptyWindow,
}

/// Error taxonomy for one ingestion run.
///
/// Every variant aborts the account task it happens in. Nothing in the core
/// retries; `retryable` only tells the caller whether running again may help.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("authentication failed: {message}")]
    Auth { message: String },

    #[error("transport error for {url}: {message}")]
    Transport {
        url: String,
        status: Option<u16>,
        message: String,
    },

    #[error("malformed {section} section: {message}")]
    MalformedSection { section: String, message: String },

    #[error("cannot parse '{field}': {message}")]
    Parse { field: String, message: String },

    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("run did not finish within {seconds}s")]
    DeadlineExceeded { seconds: u64 },

    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl IngestError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn transport(url: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            status,
            message: message.into(),
        }
    }

    pub fn malformed(section: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedSection {
            section: section.into(),
            message: message.into(),
        }
    }

    pub fn parse(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth.invalid_token",
            Self::Transport { status: Some(_), .. } => "transport.http",
            Self::Transport { status: None, .. } => "transport.network",
            Self::MalformedSection { .. } => "export.malformed_section",
            Self::Parse { .. } => "mapping.parse",
            Self::Io { .. } => "io.access",
            Self::DeadlineExceeded { .. } => "run.deadline_exceeded",
            Self::Config { .. } => "config.invalid",
        }
    }

    pub fn retryable(&self) -> bool {
        match self {
            Self::Transport { status, .. } => {
                status.map_or(true, |code| code == 429 || code >= 500)
            }
            Self::DeadlineExceeded { .. } => true,
            Self::Auth { .. }
            | Self::MalformedSection { .. }
            | Self::Parse { .. }
            | Self::Io { .. }
            | Self::Config { .. } => false,
        }
    }
}

impl From<ValidationError> for IngestError {
    fn from(error: ValidationError) -> Self {
        match error {
            ValidationError::EmptyLookback | ValidationError::EmptyWindow => Self::Config {
                message: error.to_string(),
            },
            other => Self::parse("record", other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_codes_distinguish_http_from_network_failures() {
        let http = IngestError::transport("https://api.test/v1/accounts", Some(503), "unavailable");
        let network = IngestError::transport("https://api.test/v1/accounts", None, "reset");

        assert_eq!(http.code(), "transport.http");
        assert_eq!(network.code(), "transport.network");
        assert!(http.retryable());
        assert!(network.retryable());
    }

    #[test]
    fn client_errors_are_not_retryable() {
        let error = IngestError::transport("https://api.test/v1/accounts", Some(404), "missing");
        assert!(!error.retryable());
        assert!(!IngestError::auth("expired").retryable());
    }

    #[test]
    fn validation_errors_become_parse_errors() {
        let error = IngestError::from(ValidationError::NonFiniteValue { field: "units" });
        assert_eq!(error.code(), "mapping.parse");
        assert!(error.to_string().contains("units"));
    }

    #[test]
    fn configuration_errors_keep_their_own_code() {
        let error = IngestError::from(ValidationError::EmptyLookback);
        assert_eq!(error.code(), "config.invalid");
        assert!(!error.retryable());

        let error = IngestError::from(ValidationError::EmptyWindow);
        assert!(matches!(error, IngestError::Config { .. }));
    }
}
