//! Field validation for account creation and edits.

use jiff::civil::Date;
use payloads::Policy;
use payloads::requests::HOLDER_NAME_MAX_LEN;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("holder must be at least 18 years old")]
    AgeRestriction,
    #[error("holder name must be non-empty and at most {max} characters")]
    BadHolderName { max: usize },
    #[error("phone number must be {min}-{max} digits")]
    BadPhone { min: usize, max: usize },
    #[error("website must be an http(s) URL with a host")]
    BadWebsite,
    #[error("registration number must be non-empty")]
    BadRegistrationNumber,
    #[error("company name must be non-empty")]
    BadCompanyName,
}

/// Holder must be 18 on or before `today`. A holder turning 18 exactly
/// today is accepted. Feb 29 birthdays clamp to Feb 28 in non-leap years.
pub fn validate_age(
    date_of_birth: Date,
    today: Date,
) -> Result<(), FieldError> {
    let eighteenth = date_of_birth
        .checked_add(jiff::Span::new().years(18))
        .map_err(|_| FieldError::AgeRestriction)?;
    if eighteenth > today {
        return Err(FieldError::AgeRestriction);
    }
    Ok(())
}

pub fn validate_holder_name(name: &str) -> Result<(), FieldError> {
    if name.trim().is_empty() || name.len() > HOLDER_NAME_MAX_LEN {
        return Err(FieldError::BadHolderName {
            max: HOLDER_NAME_MAX_LEN,
        });
    }
    Ok(())
}

pub fn validate_phone(
    phone: &str,
    policy: &Policy,
) -> Result<(), FieldError> {
    let digit_count = phone.len();
    if digit_count < policy.phone_min_digits
        || digit_count > policy.phone_max_digits
        || !phone.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(FieldError::BadPhone {
            min: policy.phone_min_digits,
            max: policy.phone_max_digits,
        });
    }
    Ok(())
}

/// Shape check only: scheme, host with a dot, no whitespace. Reachability
/// is not our business.
pub fn validate_website(website: &str) -> Result<(), FieldError> {
    let rest = website
        .strip_prefix("https://")
        .or_else(|| website.strip_prefix("http://"))
        .ok_or(FieldError::BadWebsite)?;
    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty()
        || !host.contains('.')
        || host.starts_with('.')
        || host.ends_with('.')
        || website.chars().any(char::is_whitespace)
    {
        return Err(FieldError::BadWebsite);
    }
    Ok(())
}

pub fn validate_company_name(name: &str) -> Result<(), FieldError> {
    if name.trim().is_empty() || name.len() > HOLDER_NAME_MAX_LEN {
        return Err(FieldError::BadCompanyName);
    }
    Ok(())
}

pub fn validate_registration_number(number: &str) -> Result<(), FieldError> {
    if number.trim().is_empty() || number.len() > 64 {
        return Err(FieldError::BadRegistrationNumber);
    }
    Ok(())
}
