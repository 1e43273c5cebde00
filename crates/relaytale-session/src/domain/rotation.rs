//! Story rotation.
//!
//! In round `r` the player at join order `j` writes story
//! `(j - 1 + r - 1) mod n`. Over rounds `1..=n` every player visits every
//! story exactly once, and in round 1 each player titles their own story.

use relaytale_core::error::DomainError;

/// Returns the story index the player at `join_order` writes in `round`.
///
/// # Errors
///
/// Returns `DomainError::Validation` if `num_players` is zero or if
/// `join_order` or `round` is zero (both are 1-based).
pub fn story_index_for(join_order: u32, round: u32, num_players: u32) -> Result<u32, DomainError> {
    if num_players == 0 {
        return Err(DomainError::Validation(
            "player count must be at least 1".to_owned(),
        ));
    }
    if join_order == 0 || round == 0 {
        return Err(DomainError::Validation(format!(
            "join order and round are 1-based (got join order {join_order}, round {round})"
        )));
    }
    let offset = u64::from(join_order - 1) + u64::from(round - 1);
    let index = offset % u64::from(num_players);
    u32::try_from(index)
        .map_err(|e| DomainError::Infrastructure(format!("story index overflow: {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn test_every_player_visits_every_story_once() {
        for num_players in 1..=10 {
            for join_order in 1..=num_players {
                let visited: Vec<u32> = (1..=num_players)
                    .map(|round| story_index_for(join_order, round, num_players).unwrap())
                    .collect();
                let distinct: BTreeSet<u32> = visited.iter().copied().collect();

                assert_eq!(visited.len(), distinct.len());
                assert_eq!(distinct, (0..num_players).collect());
            }
        }
    }

    #[test]
    fn test_every_story_has_exactly_one_writer_per_round() {
        let num_players = 5;
        for round in 1..=num_players {
            let written: BTreeSet<u32> = (1..=num_players)
                .map(|join_order| story_index_for(join_order, round, num_players).unwrap())
                .collect();
            assert_eq!(written.len(), 5);
        }
    }

    #[test]
    fn test_round_one_assigns_own_story() {
        for join_order in 1..=7 {
            assert_eq!(story_index_for(join_order, 1, 7).unwrap(), join_order - 1);
        }
    }

    #[test]
    fn test_rotation_wraps_around() {
        assert_eq!(story_index_for(3, 2, 3).unwrap(), 0);
        assert_eq!(story_index_for(2, 3, 3).unwrap(), 0);
        assert_eq!(story_index_for(1, 3, 3).unwrap(), 2);
    }

    #[test]
    fn test_zero_players_is_rejected() {
        let result = story_index_for(1, 1, 0);

        match result.unwrap_err() {
            DomainError::Validation(msg) => assert!(msg.contains("at least 1")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_join_order_is_rejected() {
        assert!(matches!(
            story_index_for(0, 1, 3),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_large_values_do_not_overflow() {
        // (2 * (u32::MAX - 1)) mod 10 == 8
        assert_eq!(story_index_for(u32::MAX, u32::MAX, 10).unwrap(), 8);
    }
}
