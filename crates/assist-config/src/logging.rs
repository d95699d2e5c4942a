//! Log output selection shared by the daemon and its tests.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Output encoding for daemon log records.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per record.
    #[default]
    Json,
    /// Single-line text for terminals.
    Compact,
}

/// Error returned when a log format name is not recognised.
pub type LogFormatParseError = strum::ParseError;

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("json", LogFormat::Json)]
    #[case("JSON", LogFormat::Json)]
    #[case("compact", LogFormat::Compact)]
    fn parses_case_insensitively(#[case] text: &str, #[case] expected: LogFormat) {
        let parsed: LogFormat = text.parse().expect("format should parse");
        assert_eq!(parsed, expected);
    }

    #[test]
    fn rejects_unknown_formats() {
        assert!("pretty".parse::<LogFormat>().is_err());
    }

    #[test]
    fn displays_snake_case() {
        assert_eq!(LogFormat::Compact.to_string(), "compact");
    }
}
