//! Entry identifier allocation.
//!
//! Identifiers double as read capabilities, so they are drawn from the
//! operating system's CSPRNG: 12 characters over base62 give roughly 71 bits
//! of entropy. Allocation is collision-oblivious; the publication path
//! detects duplicates at insert time and asks for another one.

use rand::Rng;
use rand::rngs::OsRng;

/// Number of characters in an identifier.
pub const ID_LENGTH: usize = 12;

/// Base62 alphabet: digits, upper case, lower case.
pub const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Produces candidate identifiers.
pub trait IdAllocator: Send + Sync {
    fn allocate(&self) -> String;
}

/// Uniformly random identifiers from the OS random source.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdAllocator for RandomIds {
    fn allocate(&self) -> String {
        let mut rng = OsRng;
        (0..ID_LENGTH)
            .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
            .collect()
    }
}

/// Shape check only: fixed length, every character in [`ALPHABET`].
///
/// Never consults a store, so malformed input and a miss are decided
/// independently.
pub fn is_well_formed(candidate: &str) -> bool {
    candidate.len() == ID_LENGTH && candidate.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_allocate_shape() {
        let ids = RandomIds;
        for _ in 0..200 {
            let id = ids.allocate();
            assert_eq!(id.len(), ID_LENGTH);
            assert!(is_well_formed(&id), "{id} should be well formed");
        }
    }

    #[test]
    fn test_allocate_distinct() {
        let ids = RandomIds;
        let seen: HashSet<String> = (0..1000).map(|_| ids.allocate()).collect();
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn test_allocate_covers_alphabet() {
        let ids = RandomIds;
        let seen: HashSet<u8> = (0..500).flat_map(|_| ids.allocate().into_bytes()).collect();
        // 6000 draws over 62 symbols; every symbol should appear.
        assert_eq!(seen.len(), ALPHABET.len());
    }

    #[test]
    fn test_is_well_formed() {
        assert!(is_well_formed("abcDEF123xyz"));
        assert!(is_well_formed("000000000000"));

        assert!(!is_well_formed(""));
        assert!(!is_well_formed("not-12-chars"));
        assert!(!is_well_formed("abcDEF123xy"));
        assert!(!is_well_formed("abcDEF123xyz0"));
        assert!(!is_well_formed("abcDEF123xy_"));
        assert!(!is_well_formed("abcDEF123xy/"));
        assert!(!is_well_formed("abcdéf123xy"));
    }

    #[test]
    fn test_alphabet_is_base62() {
        assert!(ALPHABET.iter().all(|b| b.is_ascii_alphanumeric()));
        let unique: HashSet<&u8> = ALPHABET.iter().collect();
        assert_eq!(unique.len(), 62);
    }
}
