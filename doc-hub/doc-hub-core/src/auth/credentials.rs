use argon2::password_hash::SaltString;
use argon2::{Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;

use crate::error::CredentialError;

const MIN_LOGIN_LEN: usize = 8;
const MIN_PASSWORD_LEN: usize = 8;

/// Checks a login against `^[A-Za-z0-9]{8,}$`.
pub fn validate_login(login: &str) -> Result<(), CredentialError> {
    if login.len() >= MIN_LOGIN_LEN && login.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(CredentialError::InvalidLogin)
    }
}

/// A password needs 8+ characters with an upper, a lower, a digit and a symbol.
pub fn validate_password(password: &str) -> Result<(), CredentialError> {
    let long_enough = password.chars().count() >= MIN_PASSWORD_LEN;
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| !c.is_ascii_alphanumeric());

    if long_enough && has_upper && has_lower && has_digit && has_symbol {
        Ok(())
    } else {
        Err(CredentialError::WeakPassword)
    }
}

/// Salted one-way password hashing with argon2id.
#[derive(Clone)]
pub struct CredentialStore {
    hasher: Argon2<'static>,
    // Verified against when a stored hash cannot be parsed, so the failure
    // path costs the same as a wrong password.
    dummy_hash: String,
}

impl CredentialStore {
    pub fn new() -> Result<Self, CredentialError> {
        Self::from_hasher(Argon2::default())
    }

    /// Uses explicit argon2 cost parameters instead of the library defaults.
    pub fn with_params(params: Params) -> Result<Self, CredentialError> {
        Self::from_hasher(Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            params,
        ))
    }

    /// Cheapest parameters argon2 accepts. Only meant for tests.
    #[doc(hidden)]
    pub fn insecure_for_tests() -> Self {
        let params = Params::new(Params::MIN_M_COST, Params::MIN_T_COST, 1, None)
            .expect("minimum argon2 params are valid");
        Self::with_params(params).expect("hashing with minimum params")
    }

    fn from_hasher(hasher: Argon2<'static>) -> Result<Self, CredentialError> {
        let mut store = Self {
            hasher,
            dummy_hash: String::new(),
        };
        store.dummy_hash = store.hash("dummy-Passw0rd!")?;
        Ok(store)
    }

    pub fn hash(&self, password: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        self.hasher
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CredentialError::Hashing(e.to_string()))
    }

    pub fn verify(&self, hash: &str, password: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .hasher
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => {
                if let Ok(dummy) = PasswordHash::new(&self.dummy_hash) {
                    let _ = self.hasher.verify_password(password.as_bytes(), &dummy);
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_policy() {
        assert!(validate_login("alice12345").is_ok());
        assert!(validate_login("ABCDEFGH").is_ok());
        assert!(validate_login("alice").is_err());
        assert!(validate_login("alice_12345").is_err());
        assert!(validate_login("alice 12345").is_err());
        assert!(validate_login("алиса12345").is_err());
        assert!(validate_login("").is_err());
    }

    #[test]
    fn password_policy_rejects_missing_classes() {
        for weak in [
            "Sh0rt!",        // too short
            "str0ng!pw",     // no upper
            "STR0NG!PW",     // no lower
            "Strong!Pw",     // no digit
            "Str0ngPw1",     // no symbol
            "",
        ] {
            assert!(validate_password(weak).is_err(), "{weak} accepted");
        }
    }

    #[test]
    fn password_policy_accepts_compliant() {
        for ok in ["Str0ng!Pw", "aB3$aB3$", "Pass word 1", "Ünïcødé9A"] {
            assert!(validate_password(ok).is_ok(), "{ok} rejected");
        }
    }

    #[test]
    fn hash_then_verify() {
        let store = CredentialStore::insecure_for_tests();
        let hash = store.hash("Str0ng!Pw").unwrap();
        assert_ne!(hash, "Str0ng!Pw");
        assert!(store.verify(&hash, "Str0ng!Pw"));
        assert!(!store.verify(&hash, "Str0ng!Px"));
    }

    #[test]
    fn salts_differ() {
        let store = CredentialStore::insecure_for_tests();
        let a = store.hash("Str0ng!Pw").unwrap();
        let b = store.hash("Str0ng!Pw").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn corrupt_hash_never_verifies() {
        let store = CredentialStore::insecure_for_tests();
        assert!(!store.verify("not-a-phc-string", "Str0ng!Pw"));
        assert!(!store.verify("", ""));
    }
}
