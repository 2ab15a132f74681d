use std::time::Duration;

use super::types::{EndpointArg, PositiveUsize};
use crate::error::{AppError, AppResult, ValidationError};

const NANOS_PER_SEC: u32 = 1_000_000_000;
const MAX_FRACTION_DIGITS: usize = 9;

pub(super) fn parse_positive_usize(s: &str) -> AppResult<PositiveUsize> {
    s.parse::<PositiveUsize>().map_err(AppError::from)
}

pub(crate) fn parse_bool_env(s: &str) -> AppResult<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "no" | "n" | "off" => Ok(false),
        _ => Err(AppError::validation(ValidationError::InvalidBoolean {
            value: s.to_owned(),
        })),
    }
}

/// Positive duration: `500ms`, `30s`, `2m`, `1h`, bare seconds (`30`) or
/// fractional seconds (`0.5`, `1.5s`).
pub(crate) fn parse_duration_arg(s: &str) -> AppResult<Duration> {
    parse_duration_text(s, false).map_err(AppError::from)
}

/// Like [`parse_duration_arg`] but accepts zero.
pub(crate) fn parse_delay_arg(s: &str) -> AppResult<Duration> {
    parse_duration_text(s, true).map_err(AppError::from)
}

pub(crate) fn parse_duration_text(s: &str, allow_zero: bool) -> Result<Duration, ValidationError> {
    let value = s.trim();
    if value.is_empty() {
        return Err(ValidationError::DurationEmpty);
    }

    let duration = if value.contains('.') {
        parse_fractional_seconds(value)?
    } else {
        parse_unit_duration(value)?
    };

    if !allow_zero && duration.is_zero() {
        return Err(ValidationError::DurationZero);
    }
    Ok(duration)
}

fn parse_unit_duration(value: &str) -> Result<Duration, ValidationError> {
    let digits_len = value.chars().take_while(char::is_ascii_digit).count();
    if digits_len == 0 {
        return Err(ValidationError::InvalidDurationFormat {
            value: value.to_owned(),
        });
    }
    let (num_part, unit_part) = value.split_at(digits_len);
    let number: u64 = num_part
        .parse()
        .map_err(|err| ValidationError::InvalidDurationNumber {
            value: value.to_owned(),
            source: err,
        })?;

    let unit = if unit_part.is_empty() { "s" } else { unit_part };
    match unit {
        "ms" => Ok(Duration::from_millis(number)),
        "s" => Ok(Duration::from_secs(number)),
        "m" => number
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or(ValidationError::DurationOverflow),
        "h" => number
            .checked_mul(60)
            .and_then(|minutes| minutes.checked_mul(60))
            .map(Duration::from_secs)
            .ok_or(ValidationError::DurationOverflow),
        _ => Err(ValidationError::InvalidDurationUnit {
            unit: unit.to_owned(),
        }),
    }
}

fn parse_fractional_seconds(value: &str) -> Result<Duration, ValidationError> {
    let invalid = || ValidationError::InvalidFractionalSeconds {
        value: value.to_owned(),
    };
    let number = value.strip_suffix('s').unwrap_or(value);
    let (whole, fraction) = number.split_once('.').ok_or_else(invalid)?;
    let all_digits = |part: &str| part.chars().all(|ch| ch.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty())
        || !all_digits(whole)
        || !all_digits(fraction)
        || fraction.len() > MAX_FRACTION_DIGITS
    {
        return Err(invalid());
    }

    let secs: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_err| invalid())?
    };
    let nanos = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", fraction, width = MAX_FRACTION_DIGITS);
        padded.parse::<u32>().map_err(|_err| invalid())?
    };
    if nanos >= NANOS_PER_SEC {
        return Err(invalid());
    }
    Ok(Duration::new(secs, nanos))
}

/// Parses `URL` or `NAME=URL`. A `=` that appears after the scheme belongs
/// to the URL.
pub(crate) fn parse_endpoint(s: &str) -> Result<EndpointArg, ValidationError> {
    let value = s.trim();
    let (name, url) = match value.split_once('=') {
        Some((name, url)) if !name.contains("://") => (Some(name.trim()), url.trim()),
        Some(_) | None => (None, value),
    };
    if url.is_empty() || name.is_some_and(str::is_empty) {
        return Err(ValidationError::InvalidEndpointFormat {
            value: s.to_owned(),
        });
    }
    validate_endpoint_url(url)?;
    Ok(EndpointArg {
        name: name.map(str::to_owned),
        url: url.to_owned(),
    })
}

/// Checks that `url` is an absolute http(s) URL with a host.
pub(crate) fn validate_endpoint_url(url: &str) -> Result<(), ValidationError> {
    let parsed = url::Url::parse(url).map_err(|err| ValidationError::InvalidUrl {
        url: url.to_owned(),
        source: err,
    })?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ValidationError::UnsupportedUrlScheme {
                scheme: other.to_owned(),
            });
        }
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ValidationError::UrlMissingHost);
    }
    Ok(())
}
