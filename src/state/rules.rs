//! Static balancing tables of the game.

/// Fewest online players a game can start (and keep running) with.
pub const MIN_PLAYERS: usize = 5;
/// Largest roster a room accepts.
pub const MAX_PLAYERS: usize = 8;
/// Number of missions in a full game.
pub const MISSION_COUNT: u8 = 5;
/// Team proposals that may be rejected in a row before the agents win.
pub const MAX_REJECTIONS: u8 = 5;
/// Missions a side needs to win the game.
pub const MISSIONS_TO_WIN: usize = 3;

/// Number of thieves and agents dealt for a given player count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleBalance {
    /// Thieves dealt.
    pub thieves: usize,
    /// Agents dealt.
    pub agents: usize,
}

/// Role split for `player_count` players, if the count is playable.
pub fn role_balance(player_count: usize) -> Option<RoleBalance> {
    let (thieves, agents) = match player_count {
        5 => (3, 2),
        6 => (4, 2),
        7 => (4, 3),
        8 => (5, 3),
        _ => return None,
    };
    Some(RoleBalance { thieves, agents })
}

/// Team sizes for missions 1 to 5, indexed by player count.
const TEAM_SIZES: [(usize, [usize; MISSION_COUNT as usize]); 4] = [
    (5, [2, 3, 2, 3, 3]),
    (6, [2, 3, 4, 3, 4]),
    (7, [2, 3, 3, 4, 4]),
    (8, [3, 4, 4, 5, 5]),
];

/// Team size required on `mission_number` (1-based) with `player_count` players.
pub fn team_size(player_count: usize, mission_number: u8) -> Option<usize> {
    let index = usize::from(mission_number).checked_sub(1)?;
    TEAM_SIZES
        .iter()
        .find(|(count, _)| *count == player_count)
        .and_then(|(_, sizes)| sizes.get(index).copied())
}

/// Fail cards needed to sabotage a mission.
///
/// The fourth mission of a large game (seven players or more) needs two.
pub fn fails_required(player_count: usize, mission_number: u8) -> usize {
    if mission_number == 4 && player_count >= 7 {
        2
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_balance_matches_table() {
        let expected = [(5, 3, 2), (6, 4, 2), (7, 4, 3), (8, 5, 3)];
        for (count, thieves, agents) in expected {
            let balance = role_balance(count).unwrap();
            assert_eq!(balance, RoleBalance { thieves, agents });
            assert_eq!(balance.thieves + balance.agents, count);
        }
        assert!(role_balance(4).is_none());
        assert!(role_balance(9).is_none());
    }

    #[test]
    fn team_sizes_match_table() {
        assert_eq!(
            (1..=5).map(|m| team_size(5, m).unwrap()).collect::<Vec<_>>(),
            vec![2, 3, 2, 3, 3]
        );
        assert_eq!(
            (1..=5).map(|m| team_size(6, m).unwrap()).collect::<Vec<_>>(),
            vec![2, 3, 4, 3, 4]
        );
        assert_eq!(
            (1..=5).map(|m| team_size(7, m).unwrap()).collect::<Vec<_>>(),
            vec![2, 3, 3, 4, 4]
        );
        assert_eq!(
            (1..=5).map(|m| team_size(8, m).unwrap()).collect::<Vec<_>>(),
            vec![3, 4, 4, 5, 5]
        );
    }

    #[test]
    fn team_size_rejects_out_of_range_lookups() {
        assert!(team_size(5, 0).is_none());
        assert!(team_size(5, 6).is_none());
        assert!(team_size(4, 1).is_none());
    }

    #[test]
    fn only_large_fourth_mission_needs_two_fails() {
        for count in 5..=8 {
            for mission in 1..=MISSION_COUNT {
                let expected = if mission == 4 && count >= 7 { 2 } else { 1 };
                assert_eq!(fails_required(count, mission), expected);
            }
        }
    }
}
