//! Seat assignment at game start and seat takeover mid-game.

use relaytale_core::model::Membership;

/// Result of compacting the join order at game start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatingPlan {
    /// Active members in their new order; seat `i` has join order `i + 1`.
    pub seated: Vec<String>,
    /// New join order for every member. Inactive members are numbered after
    /// the seats and hold no story.
    pub join_orders: Vec<(String, u32)>,
}

/// Renumbers active members to a dense `1..=N` sequence in their prior
/// relative order. `members` must be sorted by join order.
#[must_use]
pub fn compact_join_order(members: &[Membership]) -> SeatingPlan {
    let (active, inactive): (Vec<&Membership>, Vec<&Membership>) =
        members.iter().partition(|m| m.is_active);

    let seated: Vec<String> = active.iter().map(|m| m.user_id.clone()).collect();
    let join_orders = active
        .iter()
        .chain(inactive.iter())
        .zip(1..)
        .map(|(m, order)| (m.user_id.clone(), order))
        .collect();

    SeatingPlan {
        seated,
        join_orders,
    }
}

/// The disconnected seat a mid-game joiner takes over: the inactive member
/// with the lowest join order among those holding one of `seat_count` seats.
#[must_use]
pub fn vacant_seat(members: &[Membership], seat_count: u32) -> Option<&Membership> {
    members
        .iter()
        .filter(|m| !m.is_active && m.join_order >= 1 && m.join_order <= seat_count)
        .min_by_key(|m| m.join_order)
}

/// `true` when the member holds one of the `seat_count` seats of a running
/// game. Lobby members who were inactive at start hold none.
#[must_use]
pub fn holds_seat(member: &Membership, seat_count: u32) -> bool {
    (1..=seat_count).contains(&member.join_order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn member(user_id: &str, join_order: u32, is_active: bool) -> Membership {
        Membership {
            session_id: Uuid::nil(),
            user_id: user_id.to_owned(),
            join_order,
            display_name: user_id.to_owned(),
            last_active_at: Utc::now(),
            is_active,
        }
    }

    #[test]
    fn test_compaction_closes_gaps_in_prior_order() {
        let members = vec![
            member("ann", 1, true),
            member("bo", 2, false),
            member("cy", 3, true),
            member("di", 4, true),
        ];

        let plan = compact_join_order(&members);

        assert_eq!(plan.seated, vec!["ann", "cy", "di"]);
        assert_eq!(
            plan.join_orders,
            vec![
                ("ann".to_owned(), 1),
                ("cy".to_owned(), 2),
                ("di".to_owned(), 3),
                ("bo".to_owned(), 4),
            ]
        );
    }

    #[test]
    fn test_compaction_of_dense_lobby_is_identity() {
        let members = vec![member("ann", 1, true), member("bo", 2, true)];

        let plan = compact_join_order(&members);

        assert_eq!(
            plan.join_orders,
            vec![("ann".to_owned(), 1), ("bo".to_owned(), 2)]
        );
    }

    #[test]
    fn test_vacant_seat_picks_lowest_inactive_seat() {
        let members = vec![
            member("ann", 1, true),
            member("bo", 2, false),
            member("cy", 3, false),
        ];

        assert_eq!(vacant_seat(&members, 3).unwrap().user_id, "bo");
    }

    #[test]
    fn test_vacant_seat_ignores_members_without_a_seat() {
        let members = vec![
            member("ann", 1, true),
            member("bo", 2, true),
            member("late", 3, false),
        ];

        assert!(vacant_seat(&members, 2).is_none());
    }

    #[test]
    fn test_only_numbered_seats_are_held() {
        assert!(holds_seat(&member("ann", 1, true), 2));
        assert!(holds_seat(&member("bo", 2, true), 2));
        assert!(!holds_seat(&member("late", 3, true), 2));
        assert!(!holds_seat(&member("ann", 1, true), 0));
    }
}
