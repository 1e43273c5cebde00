//! Entry-word candidates.
//!
//! Words are short upper-case codes without look-alike characters
//! (`I`, `O`, `0`, `1`) so they survive being read aloud.

use relaytale_core::rng::DeterministicRng;

/// Characters an entry word is drawn from.
pub const ENTRY_WORD_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of a generated entry word.
pub const ENTRY_WORD_LENGTH: usize = 6;

/// How many candidates are tried before giving up.
pub const MAX_ENTRY_WORD_ATTEMPTS: u32 = 16;

/// Draws one candidate word.
pub fn candidate(rng: &mut dyn DeterministicRng) -> String {
    let last = u32::try_from(ENTRY_WORD_ALPHABET.len() - 1).unwrap_or(u32::MAX);
    (0..ENTRY_WORD_LENGTH)
        .map(|_| char::from(ENTRY_WORD_ALPHABET[rng.next_u32_range(0, last) as usize]))
        .collect()
}

/// Canonical form of a user-typed entry word.
#[must_use]
pub fn normalize(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaytale_test_support::{MockRng, SequenceRng};

    #[test]
    fn test_candidate_has_fixed_length_and_alphabet() {
        let mut rng = SequenceRng::new(vec![0, 5, 31, 12, 8, 30]);

        let word = candidate(&mut rng);

        assert_eq!(word.len(), ENTRY_WORD_LENGTH);
        assert!(word.bytes().all(|b| ENTRY_WORD_ALPHABET.contains(&b)));
        assert_eq!(word, "AF9NJ8");
    }

    #[test]
    fn test_mock_rng_yields_first_letter_repeated() {
        assert_eq!(candidate(&mut MockRng), "AAAAAA");
    }

    #[test]
    fn test_normalize_trims_and_uppercases() {
        assert_eq!(normalize("  af9nj8 \n"), "AF9NJ8");
    }
}
