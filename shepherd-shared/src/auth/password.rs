/// Password hashing and temporary passwords
///
/// Used by the local identity provider to store credentials, and by user
/// provisioning to mint the temporary password a new leader signs in with.
///
/// # Security
///
/// - **Algorithm**: Argon2id, 19 MiB memory, 2 passes, 1 lane
/// - **Salt**: 16 random bytes per hash
/// - **Verification**: constant time, parameters read from the stored hash
///
/// # Example
///
/// ```
/// use shepherd_shared::auth::password::{
///     generate_temporary_password, hash_password, validate_password_strength, verify_password,
/// };
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let password = generate_temporary_password();
/// validate_password_strength(&password)?;
///
/// let hash = hash_password(&password)?;
/// assert!(verify_password(&password, &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use rand::{seq::SliceRandom, Rng};

/// Length of generated temporary passwords
pub const TEMPORARY_PASSWORD_LENGTH: usize = 14;

const MIN_PASSWORD_LENGTH: usize = 8;

const UPPER: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijkmnopqrstuvwxyz";
const DIGITS: &[u8] = b"23456789";
const SYMBOLS: &[u8] = b"!@#$%^&*-_+=?";

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),

    /// Password fails the strength rules
    #[error("{0}")]
    Weak(String),
}

/// Hashes a password with Argon2id
///
/// Returns the PHC string, e.g. `$argon2id$v=19$m=19456,t=2,p=1$...`.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(19456)
        .t_cost(2)
        .p_cost(1)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(hash.to_string())
}

/// Checks a password against a stored hash
///
/// `Ok(false)` means the password is wrong; `Err` means the hash is unusable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Enforces the password rules
///
/// At least 8 characters with an uppercase letter, a lowercase letter, a digit
/// and a symbol.
pub fn validate_password_strength(password: &str) -> Result<(), PasswordError> {
    let weak = |msg: &str| Err(PasswordError::Weak(msg.to_string()));

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return weak("Password must be at least 8 characters long");
    }
    if !password.chars().any(char::is_uppercase) {
        return weak("Password must contain at least one uppercase letter");
    }
    if !password.chars().any(char::is_lowercase) {
        return weak("Password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return weak("Password must contain at least one digit");
    }
    if !password.chars().any(|c| !c.is_alphanumeric()) {
        return weak("Password must contain at least one special character");
    }

    Ok(())
}

/// Generates a random temporary password that passes
/// [`validate_password_strength`]
///
/// Look-alike characters (`0`, `O`, `1`, `l`, `I`) are left out so the
/// password can be read aloud or copied by hand.
pub fn generate_temporary_password() -> String {
    let mut rng = rand::thread_rng();
    let pick = |set: &[u8], rng: &mut rand::rngs::ThreadRng| set[rng.gen_range(0..set.len())];

    let mut bytes: Vec<u8> = vec![
        pick(UPPER, &mut rng),
        pick(LOWER, &mut rng),
        pick(DIGITS, &mut rng),
        pick(SYMBOLS, &mut rng),
    ];

    let all: Vec<u8> = [UPPER, LOWER, DIGITS, SYMBOLS].concat();
    while bytes.len() < TEMPORARY_PASSWORD_LENGTH {
        bytes.push(pick(&all, &mut rng));
    }
    bytes.shuffle(&mut rng);

    bytes.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Corr3ct-horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Corr3ct-horse", &hash).unwrap());
        assert!(!verify_password("wrong-horse", &hash).unwrap());
    }

    #[test]
    fn test_hash_uses_fresh_salt() {
        let a = hash_password("Same-passw0rd").unwrap();
        let b = hash_password("Same-passw0rd").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(PasswordError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_password_strength_rules() {
        assert!(validate_password_strength("MyP@ssw0rd").is_ok());

        let cases = [
            ("Sh0rt!", "at least 8 characters"),
            ("lowercase1!", "uppercase"),
            ("UPPERCASE1!", "lowercase"),
            ("NoDigits!!", "digit"),
            ("NoSymbols123", "special"),
        ];
        for (password, expected) in cases {
            let err = validate_password_strength(password).unwrap_err();
            assert!(
                err.to_string().contains(expected),
                "{password}: {err} should mention {expected}"
            );
        }
    }

    #[test]
    fn test_temporary_passwords_are_strong_and_distinct() {
        let first = generate_temporary_password();
        assert_eq!(first.len(), TEMPORARY_PASSWORD_LENGTH);

        for _ in 0..50 {
            let password = generate_temporary_password();
            validate_password_strength(&password).unwrap();
            assert!(!password.contains(['0', 'O', '1', 'l', 'I']));
        }

        assert_ne!(first, generate_temporary_password());
    }
}
