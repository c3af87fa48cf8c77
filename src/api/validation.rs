use time::Date;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::time::parse_date;

pub(crate) const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn validate_payload(payload: &impl Validate) -> Result<(), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))
}

pub(crate) fn validate_password_len(password: &str) -> Result<(), ApiError> {
    if password.chars().count() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )))
    }
}

pub(crate) fn validate_date(value: &str) -> Result<Date, ApiError> {
    parse_date(value)
        .ok_or_else(|| ApiError::BadRequest("Invalid date format. Use YYYY-MM-DD".to_string()))
}

/// Accepts `HH:MM` with hours 0-23 and minutes 0-59 and returns it zero-padded.
pub(crate) fn validate_hh_mm(value: &str) -> Result<String, ApiError> {
    let invalid_format = || ApiError::BadRequest("Invalid time format. Use HH:MM".to_string());

    let (hours, minutes) = value.trim().split_once(':').ok_or_else(invalid_format)?;
    let all_digits = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
    if !all_digits(hours) || !all_digits(minutes) || hours.len() > 2 || minutes.len() != 2 {
        return Err(invalid_format());
    }

    let hours: u8 = hours.parse().map_err(|_| invalid_format())?;
    let minutes: u8 = minutes.parse().map_err(|_| invalid_format())?;
    if hours > 23 || minutes > 59 {
        return Err(ApiError::BadRequest("Invalid time values".to_string()));
    }

    Ok(format!("{hours:02}:{minutes:02}"))
}

/// Rejects blank search terms; trims the rest.
pub(crate) fn search_term(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
