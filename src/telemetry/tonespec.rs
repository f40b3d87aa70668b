//! `[telemetry]` value grammar (§6.2, §4.4 step 4 "VARCMD"): a value is
//! either a bare sound-file path, or a `|`-prefixed primitive sequence —
//! `|M` (Morse text), `|I` (say-number), or `|T` (tone pair), each followed
//! by `/`-separated parameters.

use crate::error::{RptError, Result};

/// One parsed `[telemetry]` entry.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetrySpec {
    /// Plain sound-file path, played as-is.
    File(String),
    /// `|M/<text>` — spell `text` out in Morse.
    Morse(String),
    /// `|I/<number>` — speak `number` using digit sound files.
    SayNumber(i64),
    /// `|T/<freq1>/<freq2>/<ms>` — a tone pair of the given duration.
    TonePair { freq1: u32, freq2: u32, ms: u32 },
}

impl TelemetrySpec {
    pub fn parse(value: &str) -> Result<TelemetrySpec> {
        if !value.starts_with('|') {
            return Ok(TelemetrySpec::File(value.to_string()));
        }
        let mut parts = value[1..].split('/');
        let tag = parts.next().unwrap_or("");
        match tag {
            "M" => {
                let text = parts.next().unwrap_or("");
                Ok(TelemetrySpec::Morse(text.to_string()))
            }
            "I" => {
                let n: i64 = parts
                    .next()
                    .ok_or_else(|| RptError::config("<telemetry>", "|I requires a number"))?
                    .parse()
                    .map_err(|_| RptError::config("<telemetry>", "|I value is not an integer"))?;
                Ok(TelemetrySpec::SayNumber(n))
            }
            "T" => {
                let mut field = || {
                    parts
                        .next()
                        .ok_or_else(|| RptError::config("<telemetry>", "|T requires freq1/freq2/ms"))?
                        .parse::<u32>()
                        .map_err(|_| RptError::config("<telemetry>", "|T field is not a number"))
                };
                let freq1 = field()?;
                let freq2 = field()?;
                let ms = field()?;
                Ok(TelemetrySpec::TonePair { freq1, freq2, ms })
            }
            other => Err(RptError::config("<telemetry>", format!("unknown telemetry prefix '|{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_value_is_a_file() {
        assert_eq!(TelemetrySpec::parse("sounds/rpt/callsign").unwrap(), TelemetrySpec::File("sounds/rpt/callsign".to_string()));
    }

    #[test]
    fn morse_prefix_carries_its_text() {
        assert_eq!(TelemetrySpec::parse("|M/K1ABC").unwrap(), TelemetrySpec::Morse("K1ABC".to_string()));
    }

    #[test]
    fn say_number_parses_integer() {
        assert_eq!(TelemetrySpec::parse("|I/42").unwrap(), TelemetrySpec::SayNumber(42));
    }

    #[test]
    fn say_number_rejects_non_integer() {
        assert!(TelemetrySpec::parse("|I/abc").is_err());
    }

    #[test]
    fn tone_pair_parses_three_fields() {
        assert_eq!(
            TelemetrySpec::parse("|T/350/440/1000").unwrap(),
            TelemetrySpec::TonePair { freq1: 350, freq2: 440, ms: 1000 }
        );
    }

    #[test]
    fn unknown_prefix_is_an_error() {
        assert!(TelemetrySpec::parse("|Z/x").is_err());
    }
}
