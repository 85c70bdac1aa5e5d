use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    Ok(argon2.hash_password(password.as_bytes(), &salt)?.to_string())
}

/// All failure modes (bad password, unparsable digest) collapse to `false`
/// so callers answer uniformly.
pub fn verify_password(password: &str, digest: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(digest) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let digest = hash_password("s3cret").unwrap();
        assert!(verify_password("s3cret", &digest));
        assert!(!verify_password("wrong", &digest));
    }

    #[test]
    fn garbage_digest_fails_closed() {
        assert!(!verify_password("s3cret", "not-a-phc-string"));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let a = hash_password("s3cret").unwrap();
        let b = hash_password("s3cret").unwrap();
        assert_ne!(a, b);
    }
}
