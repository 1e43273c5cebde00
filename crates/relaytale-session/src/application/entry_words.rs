//! Entry-word allocation against the repository's uniqueness check.

use std::sync::Mutex;

use relaytale_core::error::DomainError;
use relaytale_core::repository::GameRepository;
use relaytale_core::rng::DeterministicRng;
use tracing::debug;
use uuid::Uuid;

use crate::domain::entry_word::{MAX_ENTRY_WORD_ATTEMPTS, candidate};

/// Draws candidates until one is claimed for `session_id`, giving up after
/// a bounded number of attempts.
///
/// # Errors
///
/// Returns `DomainError::EntryWordExhausted` when every attempt collided,
/// or `DomainError::Infrastructure` if the RNG lock or repository fails.
pub async fn allocate_entry_word(
    session_id: Uuid,
    rng: &Mutex<dyn DeterministicRng + Send>,
    repo: &dyn GameRepository,
) -> Result<String, DomainError> {
    for attempt in 1..=MAX_ENTRY_WORD_ATTEMPTS {
        let word = {
            let mut rng = rng
                .lock()
                .map_err(|e| DomainError::Infrastructure(format!("rng mutex poisoned: {e}")))?;
            candidate(&mut *rng)
        };
        if repo.claim_entry_word(&word, session_id).await? {
            return Ok(word);
        }
        debug!(%session_id, attempt, "entry word collision");
    }
    Err(DomainError::EntryWordExhausted {
        attempts: MAX_ENTRY_WORD_ATTEMPTS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaytale_test_support::{InMemoryGameRepository, MockRng, SequenceRng};

    #[tokio::test]
    async fn test_allocates_and_registers_word() {
        // Arrange
        let repo = InMemoryGameRepository::new();
        let rng = Mutex::new(MockRng);
        let session_id = Uuid::new_v4();

        // Act
        let word = allocate_entry_word(session_id, &rng, &repo).await.unwrap();

        // Assert
        assert_eq!(word, "AAAAAA");
        assert_eq!(
            repo.find_session_by_entry_word("AAAAAA").await.unwrap(),
            Some(session_id)
        );
    }

    #[tokio::test]
    async fn test_retries_past_collisions() {
        // Arrange: the first candidate is taken, the second is free.
        let repo = InMemoryGameRepository::new();
        repo.claim_entry_word("AAAAAA", Uuid::new_v4()).await.unwrap();
        let rng = Mutex::new(SequenceRng::new(vec![0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1]));
        let session_id = Uuid::new_v4();

        // Act
        let word = allocate_entry_word(session_id, &rng, &repo).await.unwrap();

        // Assert
        assert_eq!(word, "BBBBBB");
    }

    #[tokio::test]
    async fn test_gives_up_after_bounded_attempts() {
        // Arrange: the generator can only ever produce a word that is taken.
        let repo = InMemoryGameRepository::new();
        repo.claim_entry_word("AAAAAA", Uuid::new_v4()).await.unwrap();
        let rng = Mutex::new(MockRng);

        // Act
        let result = allocate_entry_word(Uuid::new_v4(), &rng, &repo).await;

        // Assert
        match result.unwrap_err() {
            DomainError::EntryWordExhausted { attempts } => assert_eq!(attempts, 16),
            other => panic!("expected EntryWordExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_concurrent_allocations_never_share_a_word() {
        // Arrange
        let repo = InMemoryGameRepository::new();
        let rng = Mutex::new(SequenceRng::new((0..32).collect()));
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        // Act
        let (a, b) = tokio::join!(
            allocate_entry_word(first, &rng, &repo),
            allocate_entry_word(second, &rng, &repo)
        );

        // Assert
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a, b);
        assert_eq!(repo.find_session_by_entry_word(&a).await.unwrap(), Some(first));
        assert_eq!(repo.find_session_by_entry_word(&b).await.unwrap(), Some(second));
    }
}
