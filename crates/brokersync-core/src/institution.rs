use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Brokerage institutions brokersync knows how to normalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Institution {
    Questrade,
    Rbcdi,
}

impl Institution {
    pub const ALL: [Self; 2] = [Self::Questrade, Self::Rbcdi];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Questrade => "questrade",
            Self::Rbcdi => "rbcdi",
        }
    }
}

impl Display for Institution {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Institution {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "questrade" => Ok(Self::Questrade),
            "rbcdi" => Ok(Self::Rbcdi),
            other => Err(ValidationError::InvalidInstitution {
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("  RBCDI ".parse::<Institution>(), Ok(Institution::Rbcdi));
        assert_eq!("questrade".parse::<Institution>(), Ok(Institution::Questrade));
    }

    #[test]
    fn rejects_unknown_institution() {
        let err = "td".parse::<Institution>().expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidInstitution { .. }));
    }

    #[test]
    fn serializes_as_lowercase_tag() {
        let json = serde_json::to_string(&Institution::Rbcdi).expect("serializable");
        assert_eq!(json, "\"rbcdi\"");
    }
}
