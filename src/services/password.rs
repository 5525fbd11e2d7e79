use ring::digest::SHA256_OUTPUT_LEN;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use std::num::NonZeroU32;

const SCHEME: &str = "pbkdf2";
const SALT_LEN: usize = 16;
const ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => panic!("iteration count must be non-zero"),
};
static ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

#[derive(thiserror::Error, Debug)]
pub enum PasswordError {
    #[error("Failed to generate salt")]
    SaltGeneration,

    #[error("Invalid password hash format")]
    InvalidFormat,
}

fn secret_bytes(password: &str, pepper: Option<&str>) -> Vec<u8> {
    let mut secret = password.as_bytes().to_vec();
    if let Some(pepper) = pepper {
        secret.extend_from_slice(pepper.as_bytes());
    }
    secret
}

/// Hashes a password with PBKDF2-HMAC-SHA256 and a random salt.
///
/// Format: `pbkdf2$<iterations>$<salt hex>$<hash hex>`
pub fn hash_password(password: &str, pepper: Option<&str>) -> Result<String, PasswordError> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| PasswordError::SaltGeneration)?;

    let mut hash = [0u8; SHA256_OUTPUT_LEN];
    pbkdf2::derive(
        ALGORITHM,
        ITERATIONS,
        &salt,
        &secret_bytes(password, pepper),
        &mut hash,
    );

    Ok(format!(
        "{}${}${}${}",
        SCHEME,
        ITERATIONS,
        hex::encode(salt),
        hex::encode(hash)
    ))
}

/// Costs the same as `verify_password`; used when there is no account to check against.
pub fn simulate_verify(password: &str, pepper: Option<&str>) {
    let mut hash = [0u8; SHA256_OUTPUT_LEN];
    pbkdf2::derive(
        ALGORITHM,
        ITERATIONS,
        &[0u8; SALT_LEN],
        &secret_bytes(password, pepper),
        &mut hash,
    );
}

/// Checks a password against a hash produced by `hash_password`.
pub fn verify_password(
    password: &str,
    pepper: Option<&str>,
    stored: &str,
) -> Result<bool, PasswordError> {
    let parts: Vec<&str> = stored.split('$').collect();
    let [scheme, iterations, salt, hash] = parts.as_slice() else {
        return Err(PasswordError::InvalidFormat);
    };

    if *scheme != SCHEME {
        return Err(PasswordError::InvalidFormat);
    }

    let iterations = iterations
        .parse::<u32>()
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or(PasswordError::InvalidFormat)?;
    let salt = hex::decode(salt).map_err(|_| PasswordError::InvalidFormat)?;
    let hash = hex::decode(hash).map_err(|_| PasswordError::InvalidFormat)?;

    Ok(pbkdf2::verify(
        ALGORITHM,
        iterations,
        &salt,
        &secret_bytes(password, pepper),
        &hash,
    )
    .is_ok())
}
