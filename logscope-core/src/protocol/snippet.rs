//! Head/tail preview decoding.

use serde::Serialize;

use super::{ProtocolError, SUCCESS_MARKER};

/// Lines of a log file preview, verbatim and in node order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogFileSnippet {
    pub lines: Vec<String>,
}

/// Decodes a head or tail response.
///
/// The marker line is dropped when present; every other line, empty ones
/// included, is kept as is.
///
/// # Errors
/// - `ProtocolError::Remote` - `success` was false; `raw` is the error text
pub fn decode_snippet(success: bool, raw: &str) -> Result<LogFileSnippet, ProtocolError> {
    if !success {
        return Err(ProtocolError::Remote(raw.to_string()));
    }

    let mut lines = raw.split('\n');
    let first = lines.next().filter(|line| !line.starts_with(SUCCESS_MARKER));

    Ok(LogFileSnippet {
        lines: first.into_iter().chain(lines).map(str::to_string).collect(),
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_marker_line_dropped() {
        let snippet = decode_snippet(true, "SUCCESS\nfirst\n\nthird").unwrap();
        assert_eq!(snippet.lines, vec!["first", "", "third"]);
    }

    #[test]
    fn test_marker_only_yields_no_lines() {
        let snippet = decode_snippet(true, "SUCCESS").unwrap();
        assert!(snippet.lines.is_empty());
    }

    #[test]
    fn test_missing_marker_keeps_every_line() {
        let snippet = decode_snippet(true, "line one\nline two").unwrap();
        assert_eq!(snippet.lines, vec!["line one", "line two"]);
    }

    #[test]
    fn test_failed_request_passes_text_through() {
        let result = decode_snippet(false, "file not found");
        assert_eq!(
            result,
            Err(ProtocolError::Remote("file not found".to_string()))
        );
    }

    proptest! {
        #[test]
        fn prop_line_count_is_input_minus_marker(
            body in proptest::collection::vec("[^\n]{0,12}", 0..10)
        ) {
            let mut raw = String::from(SUCCESS_MARKER);
            for line in &body {
                raw.push('\n');
                raw.push_str(line);
            }
            let input_lines = raw.split('\n').count();

            let snippet = decode_snippet(true, &raw).unwrap();
            prop_assert_eq!(snippet.lines.len(), input_lines - 1);
            prop_assert_eq!(snippet.lines, body);
        }
    }
}
