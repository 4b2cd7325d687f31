//! Random identifier generation.
//!
//! Room IDs and session tokens are both alphanumeric strings drawn from the
//! operating system's CSPRNG. Uniqueness is not guaranteed here; callers that
//! need it (room creation) check against the store and retry.

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;

/// Generate a cryptographically random alphanumeric string of length `n`.
///
/// The alphabet is `[0-9A-Za-z]`.
#[must_use]
pub fn generate_id(n: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(n)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_id_length() {
        assert_eq!(generate_id(10).len(), 10);
        assert_eq!(generate_id(32).len(), 32);
        assert!(generate_id(0).is_empty());
    }

    #[test]
    fn test_generate_id_is_alphanumeric() {
        let id = generate_id(256);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_id_does_not_repeat() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_id(16)).collect();
        assert_eq!(ids.len(), 1000);
    }
}
