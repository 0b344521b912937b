//! Response parsing
//!
//! The projector answers every query with a line of the form
//! `i:OK\g:<KEY>=<payload>\`. There is no length prefix or terminator beyond
//! the trailing backslash, and the port may echo the command back first, so
//! each parser searches for its own shape and rejects anything else.
//!
//! All parsers return `Ok(None)` for an empty response: the projector did not
//! answer in time and there is nothing to report.

use regex::Regex;
use std::sync::OnceLock;

use super::{Command, ProtocolError};
use crate::reading::{ErrorStatus, PowerState, TEMPERATURE_COUNT};

/// Error code reported by a healthy projector
pub const NO_ERROR: &str = "NO_ERROR";

fn error_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"i:OK\\g:ERR=([^\\]*)\\").expect("valid error regex"))
}

fn power_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"i:OK\\g:POWER=([^\\]*)\\").expect("valid power regex"))
}

fn temp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"i:OK\\g:TEMP=([^\\]*)\\").expect("valid temp regex"))
}

/// Find the payload of a `i:OK\g:<KEY>=...\` response.
///
/// Returns `Ok(None)` when the response is blank.
fn payload<'a>(
    re: &Regex,
    command: Command,
    raw: &'a str,
) -> Result<Option<&'a str>, ProtocolError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let caps = re
        .captures(raw)
        .ok_or_else(|| ProtocolError::malformed(command, "unexpected response shape", raw))?;

    // Group 1 always participates in a match
    Ok(caps.get(1).map(|m| m.as_str().trim()))
}

/// Parse the reply to `get=err`
pub fn parse_error(raw: &str) -> Result<Option<ErrorStatus>, ProtocolError> {
    let Some(code) = payload(error_re(), Command::GetError, raw)? else {
        return Ok(None);
    };

    match code {
        "" => Err(ProtocolError::malformed(
            Command::GetError,
            "empty error code",
            raw,
        )),
        NO_ERROR => Ok(Some(ErrorStatus::NoError)),
        other => Ok(Some(ErrorStatus::Fault(other.to_string()))),
    }
}

/// Parse the reply to `get=power`
pub fn parse_power(raw: &str) -> Result<Option<PowerState>, ProtocolError> {
    let Some(state) = payload(power_re(), Command::GetPower, raw)? else {
        return Ok(None);
    };

    match state {
        "ON" => Ok(Some(PowerState::On)),
        "OFF" => Ok(Some(PowerState::Off)),
        other => Err(ProtocolError::malformed(
            Command::GetPower,
            format!("unknown power state '{other}'"),
            raw,
        )),
    }
}

/// Parse the reply to `get=temp`: a sensor count followed by that many values
pub fn parse_temperatures(raw: &str) -> Result<Option<[f64; TEMPERATURE_COUNT]>, ProtocolError> {
    let Some(body) = payload(temp_re(), Command::GetTemperature, raw)? else {
        return Ok(None);
    };

    let malformed = |reason: String| ProtocolError::malformed(Command::GetTemperature, reason, raw);

    let mut fields = body.split(',').map(str::trim);

    let count = fields
        .next()
        .and_then(|c| c.parse::<usize>().ok())
        .ok_or_else(|| malformed("missing sensor count".to_string()))?;
    if count != TEMPERATURE_COUNT {
        return Err(malformed(format!(
            "expected {TEMPERATURE_COUNT} sensors, projector reports {count}"
        )));
    }

    let values = fields
        .map(|field| match field.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(malformed(format!("non-numeric temperature '{field}'"))),
        })
        .collect::<Result<Vec<f64>, _>>()?;

    <[f64; TEMPERATURE_COUNT]>::try_from(values.as_slice()).map_err(|_| {
        malformed(format!(
            "expected {TEMPERATURE_COUNT} values, got {}",
            values.len()
        ))
    })
    .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_error() {
        assert_eq!(
            parse_error(r"i:OK\g:ERR=NO_ERROR\").unwrap(),
            Some(ErrorStatus::NoError)
        );
    }

    #[test]
    fn test_error_code_is_kept_verbatim() {
        assert_eq!(
            parse_error(r"i:OK\g:ERR=LAMP_FAILURE\").unwrap(),
            Some(ErrorStatus::Fault("LAMP_FAILURE".to_string()))
        );
    }

    #[test]
    fn test_error_with_echo_and_line_noise() {
        assert_eq!(
            parse_error("\rget=err\ri:OK\\g:ERR=FAN\\\r\n").unwrap(),
            Some(ErrorStatus::Fault("FAN".to_string()))
        );
    }

    #[test]
    fn test_empty_error_code_is_malformed() {
        assert!(parse_error(r"i:OK\g:ERR=\").unwrap_err().is_malformed());
    }

    #[test]
    fn test_power_on_and_off_are_distinct() {
        assert_eq!(
            parse_power(r"i:OK\g:POWER=ON\").unwrap(),
            Some(PowerState::On)
        );
        assert_eq!(
            parse_power(r"i:OK\g:POWER=OFF\").unwrap(),
            Some(PowerState::Off)
        );
    }

    #[test]
    fn test_unknown_power_state_is_malformed() {
        let err = parse_power(r"i:OK\g:POWER=STANDBY\").unwrap_err();
        assert!(err.to_string().contains("STANDBY"));
    }

    #[test]
    fn test_power_reply_to_wrong_query_is_malformed() {
        assert!(parse_power(r"i:OK\g:ERR=NO_ERROR\").unwrap_err().is_malformed());
    }

    #[test]
    fn test_temperatures() {
        let temps = parse_temperatures(r"i:OK\g:TEMP=8,64.1,43.8,56.5,47.1,21.7,44.3,70.1,77.2\")
            .unwrap()
            .unwrap();
        assert_eq!(temps, [64.1, 43.8, 56.5, 47.1, 21.7, 44.3, 70.1, 77.2]);
    }

    #[test]
    fn test_negative_and_integer_temperatures() {
        let temps = parse_temperatures(r"i:OK\g:TEMP=8,-1.5,0,2,3,4,5,6,7\")
            .unwrap()
            .unwrap();
        assert_eq!(temps[0], -1.5);
        assert_eq!(temps[1], 0.0);
    }

    #[test]
    fn test_too_few_temperatures() {
        let err = parse_temperatures(r"i:OK\g:TEMP=8,64.1,43.8\").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_wrong_sensor_count() {
        let err = parse_temperatures(r"i:OK\g:TEMP=7,1,2,3,4,5,6,7\").unwrap_err();
        assert!(err.to_string().contains("projector reports 7"));
    }

    #[test]
    fn test_non_numeric_temperature() {
        let err =
            parse_temperatures(r"i:OK\g:TEMP=8,64.1,hot,56.5,47.1,21.7,44.3,70.1,77.2\").unwrap_err();
        assert!(err.to_string().contains("'hot'"));
    }

    #[test]
    fn test_non_finite_temperature() {
        assert!(parse_temperatures(r"i:OK\g:TEMP=8,NaN,1,2,3,4,5,6,7\").is_err());
    }

    #[test]
    fn test_truncated_response_is_malformed() {
        // Reply cut off before the trailing backslash
        assert!(parse_temperatures(r"i:OK\g:TEMP=8,64.1,43.8,56.5").is_err());
    }

    #[test]
    fn test_empty_response_is_no_reading() {
        assert_eq!(parse_error("").unwrap(), None);
        assert_eq!(parse_power("").unwrap(), None);
        assert_eq!(parse_temperatures("  \r\n").unwrap(), None);
    }
}
