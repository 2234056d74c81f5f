use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::IngestError;

/// File-name pattern with a single `*` wildcard, e.g. `Holdings*.csv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePattern {
    prefix: String,
    suffix: String,
}

impl FilePattern {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn matches(&self, file_name: &str) -> bool {
        file_name.len() >= self.prefix.len() + self.suffix.len()
            && file_name.starts_with(&self.prefix)
            && file_name.ends_with(&self.suffix)
    }
}

impl FromStr for FilePattern {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.split_once('*') {
            Some((prefix, suffix)) if !suffix.contains('*') => Ok(Self::new(prefix, suffix)),
            Some(_) => Err(format!("pattern '{value}' may contain only one '*'")),
            None => Ok(Self::new(value, "")),
        }
    }
}

impl Display for FilePattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}*{}", self.prefix, self.suffix)
    }
}

/// Lists regular files in `dir` whose names match `pattern`, sorted by name.
pub fn discover_files(dir: &Path, pattern: &FilePattern) -> Result<Vec<PathBuf>, IngestError> {
    let entries =
        std::fs::read_dir(dir).map_err(|error| IngestError::io(dir.display().to_string(), error))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|error| IngestError::io(dir.display().to_string(), error))?;
        let path = entry.path();
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| pattern.matches(name));
        if matches && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
