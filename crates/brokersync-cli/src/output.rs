use std::io::Write;

use serde::Serialize;

use crate::error::CliError;

/// Writes `records` as one JSON document to stdout; logs go to stderr.
pub fn render<T: Serialize + ?Sized>(records: &T, compact: bool) -> Result<(), CliError> {
    let payload = to_json(records, compact)?;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{payload}")?;
    handle.flush()?;
    Ok(())
}

fn to_json<T: Serialize + ?Sized>(records: &T, compact: bool) -> Result<String, CliError> {
    let payload = if compact {
        serde_json::to_string(records)?
    } else {
        serde_json::to_string_pretty(records)?
    };
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_output_is_indented_by_two_spaces() {
        let payload = to_json(&serde_json::json!([{"a": 1}]), false).expect("serializable");
        assert_eq!(payload, "[\n  {\n    \"a\": 1\n  }\n]");
        assert_eq!(to_json(&serde_json::json!([]), true).expect("serializable"), "[]");
    }
}
