//! Log file listing decoding.

use serde::Serialize;

use super::{ProtocolError, SUCCESS_MARKER};

/// Separator between filename and size on a listing line.
const FIELD_SEPARATOR: &str = " | ";

/// Unit letters for 1024-based sizes, starting at kibibytes.
const UNIT_LETTERS: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

/// One log file available on the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogFileEntry {
    pub filename: String,
    pub size: u64,
    /// Human readable size, e.g. `1.5KB`
    pub printed_size: String,
}

/// Log files reported by a node's list response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogFileListing {
    pub entries: Vec<LogFileEntry>,
}

impl LogFileListing {
    /// Looks up an entry by its exact filename.
    pub fn entry(&self, filename: &str) -> Option<&LogFileEntry> {
        self.entries.iter().find(|entry| entry.filename == filename)
    }
}

/// Decodes a list response of the form `SUCCESS\n<name> | <size>\n...`.
///
/// Blank lines are ignored. A single malformed line rejects the whole
/// listing.
///
/// # Errors
/// - `ProtocolError::Remote` - `success` was false; `raw` is the error text
/// - `ProtocolError::TooFewLines` - Fewer than two lines
/// - `ProtocolError::MissingSuccessMarker` - First line lacks the marker
/// - `ProtocolError::MalformedListLine` - Line without exactly two fields
/// - `ProtocolError::InvalidSize` - Size is not a base-10 u64
pub fn decode_listing(success: bool, raw: &str) -> Result<LogFileListing, ProtocolError> {
    if !success {
        return Err(ProtocolError::Remote(raw.to_string()));
    }

    let lines: Vec<&str> = raw.split('\n').collect();
    if lines.len() < 2 {
        return Err(ProtocolError::TooFewLines {
            lines: lines.iter().map(|line| line.to_string()).collect(),
        });
    }
    if !lines[0].starts_with(SUCCESS_MARKER) {
        return Err(ProtocolError::MissingSuccessMarker {
            first_line: lines[0].to_string(),
        });
    }

    let mut entries = Vec::new();
    for line in lines[1..].iter().filter(|line| !line.is_empty()) {
        let terms: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        let &[filename, size] = terms.as_slice() else {
            return Err(ProtocolError::MalformedListLine {
                line: line.to_string(),
            });
        };

        let size = size.parse::<u64>().map_err(|_| ProtocolError::InvalidSize {
            line: line.to_string(),
            size: size.to_string(),
        })?;

        entries.push(LogFileEntry {
            filename: filename.to_string(),
            size,
            printed_size: format_byte_count(size),
        });
    }

    Ok(LogFileListing { entries })
}

/// Formats a byte count with 1024-based units.
///
/// # Examples
/// ```
/// use logscope_core::protocol::format_byte_count;
///
/// assert_eq!(format_byte_count(1023), "1023B");
/// assert_eq!(format_byte_count(1536), "1.5KB");
/// assert_eq!(format_byte_count(1_572_864), "1.5MB");
/// ```
pub fn format_byte_count(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{bytes}B");
    }

    let mut divisor = UNIT;
    let mut exponent = 0;
    let mut remaining = bytes / UNIT;
    while remaining >= UNIT {
        divisor *= UNIT;
        exponent += 1;
        remaining /= UNIT;
    }

    format!(
        "{:.1}{}B",
        bytes as f64 / divisor as f64,
        UNIT_LETTERS[exponent]
    )
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_decode_single_entry() {
        let listing = decode_listing(true, "SUCCESS\nerigon.log | 2048\n").unwrap();

        assert_eq!(
            listing.entries,
            vec![LogFileEntry {
                filename: "erigon.log".to_string(),
                size: 2048,
                printed_size: "2.0KB".to_string(),
            }]
        );
    }

    #[test]
    fn test_decode_skips_blank_lines() {
        let raw = "SUCCESS\n\na.log | 10\n\nb.log | 1536\n";
        let listing = decode_listing(true, raw).unwrap();

        assert_eq!(listing.entries.len(), 2);
        assert_eq!(listing.entry("b.log").unwrap().printed_size, "1.5KB");
        assert!(listing.entry("c.log").is_none());
    }

    #[test]
    fn test_failed_request_passes_text_through() {
        let result = decode_listing(false, "node unreachable");
        assert_eq!(
            result,
            Err(ProtocolError::Remote("node unreachable".to_string()))
        );
    }

    #[test]
    fn test_single_line_response_rejected() {
        let result = decode_listing(true, "SUCCESS");
        assert!(matches!(result, Err(ProtocolError::TooFewLines { .. })));
    }

    #[test]
    fn test_missing_marker_rejected() {
        let result = decode_listing(true, "FAILURE\na.log | 1\n");
        assert!(matches!(
            result,
            Err(ProtocolError::MissingSuccessMarker { first_line }) if first_line == "FAILURE"
        ));
    }

    #[test]
    fn test_bad_line_rejects_whole_listing() {
        let result = decode_listing(true, "SUCCESS\ngood.log | 1\nbroken line\n");
        let error = result.unwrap_err();

        assert_eq!(
            error,
            ProtocolError::MalformedListLine {
                line: "broken line".to_string()
            }
        );
        assert!(error.to_string().contains("broken line"));
    }

    #[test]
    fn test_extra_separator_rejected() {
        let result = decode_listing(true, "SUCCESS\na | b | 3\n");
        assert!(matches!(result, Err(ProtocolError::MalformedListLine { .. })));
    }

    #[test]
    fn test_non_decimal_size_rejected() {
        let error = decode_listing(true, "SUCCESS\na.log | 0x10\n").unwrap_err();
        assert!(error.to_string().contains("a.log | 0x10"));

        let negative = decode_listing(true, "SUCCESS\na.log | -1\n");
        assert!(matches!(negative, Err(ProtocolError::InvalidSize { .. })));
    }

    #[test]
    fn test_byte_count_thresholds() {
        assert_eq!(format_byte_count(0), "0B");
        assert_eq!(format_byte_count(1023), "1023B");
        assert_eq!(format_byte_count(1024), "1.0KB");
        assert_eq!(format_byte_count(1536), "1.5KB");
        assert_eq!(format_byte_count(1_572_864), "1.5MB");
        assert_eq!(format_byte_count(1 << 30), "1.0GB");
        assert_eq!(format_byte_count(u64::MAX), "16.0EB");
    }

    proptest! {
        #[test]
        fn prop_listing_reproduces_entries(
            entries in proptest::collection::vec(("[a-z][a-z0-9._-]{0,20}", any::<u64>()), 0..8)
        ) {
            let mut raw = String::from("SUCCESS\n");
            for (name, size) in &entries {
                raw.push_str(&format!("{name} | {size}\n"));
            }

            let listing = decode_listing(true, &raw).unwrap();
            let decoded: Vec<(String, u64)> = listing
                .entries
                .iter()
                .map(|entry| (entry.filename.clone(), entry.size))
                .collect();

            prop_assert_eq!(decoded, entries);
            for entry in &listing.entries {
                prop_assert_eq!(&entry.printed_size, &format_byte_count(entry.size));
            }
        }
    }
}
