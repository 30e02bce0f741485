//! PIN vault: shape validation, salted slow hashing, and uniform-failure
//! verification. The original PIN is never stored or logged; only PHC
//! strings reach the database.

use anyhow::Context;
use argon2::password_hash::SaltString;
use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher,
    PasswordVerifier, Version,
};
use payloads::Policy;
use secrecy::{ExposeSecret, SecretBox};

use crate::telemetry::spawn_blocking_with_tracing;

/// PHC hash of a PIN no account uses. Verifying candidates against it when
/// the target account does not exist keeps the failure path's timing
/// uniform, so the internal verify endpoint does not disclose existence.
const FALLBACK_PIN_HASH: &str = "$argon2id$v=19$m=15000,t=2,p=1$\
    gZiV/M1gPc22ElAH/Jh1Hw$\
    CWOrkoo7oJBQ/iyh7uJ0LO2aLEfrHwTWllSAxT0zRno";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PinShapeError {
    #[error("PIN must be {min}-{max} digits")]
    BadLength { min: usize, max: usize },
    #[error("PIN must be numeric")]
    NotNumeric,
    #[error("PIN digits must not all be identical")]
    Uniform,
    #[error("PIN must not be a sequential run")]
    Sequential,
}

/// Check a candidate PIN against the configured shape rules: 4-6 digits,
/// not all identical, not a strictly ascending or descending run.
pub fn validate_pin_shape(
    pin: &str,
    policy: &Policy,
) -> Result<(), PinShapeError> {
    let digits: Vec<u8> = pin.bytes().collect();
    if digits.len() < policy.pin_min_len
        || digits.len() > policy.pin_max_len
    {
        return Err(PinShapeError::BadLength {
            min: policy.pin_min_len,
            max: policy.pin_max_len,
        });
    }
    if !digits.iter().all(|b| b.is_ascii_digit()) {
        return Err(PinShapeError::NotNumeric);
    }
    if policy.reject_uniform_pin
        && digits.windows(2).all(|w| w[0] == w[1])
    {
        return Err(PinShapeError::Uniform);
    }
    if policy.reject_sequential_pin {
        let ascending = digits.windows(2).all(|w| w[1] == w[0] + 1);
        let descending = digits.windows(2).all(|w| w[0] == w[1] + 1);
        if ascending || descending {
            return Err(PinShapeError::Sequential);
        }
    }
    Ok(())
}

/// Hash a PIN on a blocking thread.
pub async fn hash_pin(
    pin: SecretBox<String>,
) -> Result<String, anyhow::Error> {
    let hash = spawn_blocking_with_tracing(move || compute_pin_hash(pin))
        .await
        .context("Failed to spawn blocking task.")??;
    Ok(hash)
}

fn compute_pin_hash(
    pin: SecretBox<String>,
) -> Result<String, anyhow::Error> {
    let salt = SaltString::generate(&mut rand_core::OsRng);
    let hash = Argon2::new(
        Algorithm::Argon2id,
        Version::V0x13,
        Params::new(15000, 2, 1, None).unwrap(),
    )
    .hash_password(pin.expose_secret().as_bytes(), &salt)?
    .to_string();
    Ok(hash)
}

/// Verify a candidate PIN against a stored hash on a blocking thread.
///
/// `stored_hash = None` means the account was not found; the candidate is
/// still verified against [`FALLBACK_PIN_HASH`] and the result is `false`,
/// so missing and mismatching accounts are indistinguishable to callers
/// and to a clock.
pub async fn verify_pin(
    stored_hash: Option<String>,
    candidate: SecretBox<String>,
) -> Result<bool, anyhow::Error> {
    let known = stored_hash.is_some();
    let hash = SecretBox::new(Box::new(
        stored_hash.unwrap_or_else(|| FALLBACK_PIN_HASH.to_string()),
    ));
    let matched = spawn_blocking_with_tracing(move || {
        verify_pin_hash(hash, candidate)
    })
    .await
    .context("Failed to spawn blocking task.")??;
    Ok(matched && known)
}

fn verify_pin_hash(
    expected_hash: SecretBox<String>,
    candidate: SecretBox<String>,
) -> Result<bool, anyhow::Error> {
    let expected = PasswordHash::new(expected_hash.expose_secret())
        .context("Failed to parse hash in PHC string format.")?;
    Ok(Argon2::default()
        .verify_password(candidate.expose_secret().as_bytes(), &expected)
        .is_ok())
}
