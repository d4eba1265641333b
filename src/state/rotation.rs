use rand::{Rng, seq::IndexedRandom};

use crate::state::room::Room;

/// Pick the participant who should hold the Mastermind token next.
///
/// Scans `player_order` cyclically, starting right after the current Mastermind
/// (or from the beginning when there is none or it is no longer listed), and
/// returns the first online participant. Falls back to a random online
/// participant, or `None` when nobody is online.
pub fn next_mastermind<R: Rng + ?Sized>(room: &Room, rng: &mut R) -> Option<String> {
    let order = &room.player_order;
    let start = room
        .mastermind_id
        .as_ref()
        .and_then(|current| order.iter().position(|id| id == current))
        .map(|index| index + 1)
        .unwrap_or(0);

    let is_online = |id: &String| room.players.get(id).is_some_and(|player| player.is_online);

    let next = (0..order.len())
        .filter_map(|offset| order.get((start + offset) % order.len()))
        .find(|id| is_online(*id))
        .cloned();

    next.or_else(|| random_online(room, rng))
}

/// Uniformly pick one online participant.
pub fn random_online<R: Rng + ?Sized>(room: &Room, rng: &mut R) -> Option<String> {
    room.online_ids().choose(rng).cloned()
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::state::room::Player;

    fn room_with(ids: &[&str]) -> Room {
        let mut players = ids.iter().map(|id| {
            Player::new(id.to_string(), id.to_uppercase(), "char1".into(), "#fff".into())
        });
        let mut room = Room::new("room".into(), players.next().unwrap(), false);
        for player in players {
            room.player_order.push(player.id.clone());
            room.players.insert(player.id.clone(), player);
        }
        room
    }

    fn set_offline(room: &mut Room, id: &str) {
        room.players.get_mut(id).unwrap().is_online = false;
    }

    #[test]
    fn full_cycle_visits_every_online_player_once() {
        let mut room = room_with(&["a", "b", "c", "d", "e"]);
        set_offline(&mut room, "c");
        let mut rng = StdRng::seed_from_u64(7);

        room.mastermind_id = Some("a".into());
        let mut visited = Vec::new();
        for _ in 0..4 {
            let next = next_mastermind(&room, &mut rng).unwrap();
            visited.push(next.clone());
            room.mastermind_id = Some(next);
        }
        assert_eq!(visited, vec!["b", "d", "e", "a"]);
    }

    #[test]
    fn offline_mastermind_hands_over_to_next_in_order() {
        let mut room = room_with(&["a", "b", "c", "d", "e"]);
        room.mastermind_id = Some("b".into());
        set_offline(&mut room, "b");
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(next_mastermind(&room, &mut rng).as_deref(), Some("c"));
    }

    #[test]
    fn wraps_around_the_order() {
        let mut room = room_with(&["a", "b", "c"]);
        room.mastermind_id = Some("c".into());
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(next_mastermind(&room, &mut rng).as_deref(), Some("a"));
    }

    #[test]
    fn unknown_mastermind_starts_from_the_beginning() {
        let mut room = room_with(&["a", "b", "c"]);
        room.mastermind_id = Some("ghost".into());
        set_offline(&mut room, "a");
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(next_mastermind(&room, &mut rng).as_deref(), Some("b"));
    }

    #[test]
    fn falls_back_to_random_online_player_outside_the_order() {
        let mut room = room_with(&["a", "b"]);
        room.player_order = vec!["a".into()];
        set_offline(&mut room, "a");
        let mut rng = StdRng::seed_from_u64(3);

        assert_eq!(next_mastermind(&room, &mut rng).as_deref(), Some("b"));
    }

    #[test]
    fn nobody_online_yields_none() {
        let mut room = room_with(&["a", "b"]);
        set_offline(&mut room, "a");
        set_offline(&mut room, "b");
        let mut rng = StdRng::seed_from_u64(3);

        assert!(next_mastermind(&room, &mut rng).is_none());
    }
}
