use rand::Rng;

use crate::state::{
    room::{Phase, Room, RoomStatus},
    rules::MIN_PLAYERS,
    state_machine::DeferredTransition,
};

/// What a departure did to the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The participant was unknown or already offline; nothing changed.
    Ignored,
    /// The room can no longer go on and must be torn down.
    Terminated,
    /// The room goes on, possibly with an automatic follow-up to schedule.
    Continued(Option<DeferredTransition>),
}

impl Room {
    /// Apply the side effects of `player_id` leaving or disconnecting.
    pub fn reconcile_exit<R: Rng + ?Sized>(&mut self, player_id: &str, rng: &mut R) -> ExitOutcome {
        let Some(player) = self.players.get_mut(player_id).filter(|player| player.is_online) else {
            return ExitOutcome::Ignored;
        };
        player.is_online = false;
        let name = player.display_name.clone();
        self.log_event(format!("{name} has left the game."));

        // A finished game stays around for the host to reset.
        if self.status == RoomStatus::Finished {
            return ExitOutcome::Continued(None);
        }
        if player_id == self.host_id {
            self.log_event("The host has left. The game has been terminated.");
            self.status = RoomStatus::Finished;
            return ExitOutcome::Terminated;
        }
        if self.status != RoomStatus::Lobby && self.online_count() < MIN_PLAYERS {
            self.log_event("Not enough players to continue. The game has been terminated.");
            self.status = RoomStatus::Finished;
            return ExitOutcome::Terminated;
        }

        let follow_up = match self.phase() {
            // A proposed team must stay complete until its mission is played.
            Some(Phase::TeamVote | Phase::VoteReveal | Phase::Mission) if self.is_on_team(player_id) => {
                self.abort_mission(rng);
                None
            }
            Some(Phase::TeamSelection) if self.mastermind_id.as_deref() == Some(player_id) => {
                self.rotate_mastermind(rng);
                let next = self
                    .mastermind_id
                    .as_deref()
                    .map(|id| self.display_name(id))
                    .unwrap_or_default();
                self.log_event(format!("{next} is the new Mastermind."));
                None
            }
            // The departed ballot may have been the last one missing.
            Some(Phase::TeamVote) => self.close_vote_if_complete(),
            _ => None,
        };
        ExitOutcome::Continued(follow_up)
    }

    fn is_on_team(&self, player_id: &str) -> bool {
        self.proposed_team
            .as_ref()
            .is_some_and(|team| team.iter().any(|member| member == player_id))
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::state::{
        room::{Vote, Winner},
        rules::MAX_REJECTIONS,
        state_machine::{
            DeferredKind,
            tests::{lobby_with, running_with},
        },
    };

    #[test]
    fn unknown_or_offline_player_is_ignored() {
        let mut room = lobby_with(3);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(room.reconcile_exit("ghost", &mut rng), ExitOutcome::Ignored);

        assert_eq!(room.reconcile_exit("p1", &mut rng), ExitOutcome::Continued(None));
        let log_len = room.game_log.len();
        assert_eq!(room.reconcile_exit("p1", &mut rng), ExitOutcome::Ignored);
        assert_eq!(room.game_log.len(), log_len);
    }

    #[test]
    fn lobby_departure_only_marks_offline() {
        let mut room = lobby_with(3);
        let mut rng = StdRng::seed_from_u64(0);
        room.reconcile_exit("p2", &mut rng);
        assert!(!room.players["p2"].is_online);
        assert_eq!(room.status, RoomStatus::Lobby);
        assert_eq!(room.game_log.last().unwrap().message, "Player 2 has left the game.");
    }

    #[test]
    fn host_departure_terminates_unfinished_rooms() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut lobby = lobby_with(3);
        assert_eq!(lobby.reconcile_exit("p0", &mut rng), ExitOutcome::Terminated);
        assert_eq!(lobby.status, RoomStatus::Finished);

        let mut running = running_with(6, &mut rng);
        assert_eq!(running.reconcile_exit("p0", &mut rng), ExitOutcome::Terminated);
        assert!(running.winner.is_none());
    }

    #[test]
    fn dropping_below_minimum_terminates_running_game() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut room = running_with(6, &mut rng);
        assert!(matches!(room.reconcile_exit("p5", &mut rng), ExitOutcome::Continued(_)));
        assert_eq!(room.reconcile_exit("p4", &mut rng), ExitOutcome::Terminated);
        assert_eq!(
            room.game_log.last().unwrap().message,
            "Not enough players to continue. The game has been terminated."
        );
    }

    #[test]
    fn finished_room_survives_a_non_host_departure() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut room = running_with(5, &mut rng);
        room.status = RoomStatus::Finished;
        room.winner = Some(Winner::Thieves);

        assert_eq!(room.reconcile_exit("p3", &mut rng), ExitOutcome::Continued(None));
        assert!(!room.players["p3"].is_online);
        assert_eq!(room.status, RoomStatus::Finished);
        assert_eq!(room.online_count(), 4);

        assert_eq!(room.reconcile_exit("p0", &mut rng), ExitOutcome::Continued(None));
        assert_eq!(room.winner, Some(Winner::Thieves));
    }

    #[test]
    fn mastermind_leaving_team_selection_hands_token_to_next_in_order() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut room = running_with(6, &mut rng);
        room.mastermind_id = Some("p2".into());

        room.reconcile_exit("p2", &mut rng);
        assert_eq!(room.mastermind_id.as_deref(), Some("p3"));
        assert_eq!(room.phase(), Some(Phase::TeamSelection));
    }

    #[test]
    fn team_member_leaving_aborts_the_mission() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut room = running_with(6, &mut rng);
        room.mastermind_id = Some("p1".into());
        room.proposed_team = Some(vec!["p2".into(), "p3".into()]);
        room.status = RoomStatus::InProgress(Phase::Mission);

        room.reconcile_exit("p3", &mut rng);
        assert_eq!(room.phase(), Some(Phase::TeamSelection));
        assert_eq!(room.round_number, 2);
        assert!(room.proposed_team.is_none());
        assert_eq!(room.mastermind_id.as_deref(), Some("p2"));
    }

    #[test]
    fn aborting_on_the_last_round_hands_victory_to_agents() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut room = running_with(6, &mut rng);
        room.round_number = MAX_REJECTIONS;
        room.proposed_team = Some(vec!["p2".into(), "p3".into()]);
        room.status = RoomStatus::InProgress(Phase::Mission);

        room.reconcile_exit("p2", &mut rng);
        assert_eq!(room.status, RoomStatus::Finished);
        assert_eq!(room.winner, Some(Winner::Agents));
        assert_eq!(room.round_number, MAX_REJECTIONS);
    }

    #[test]
    fn team_member_leaving_before_the_mission_aborts_it() {
        for phase in [Phase::TeamVote, Phase::VoteReveal] {
            let mut rng = StdRng::seed_from_u64(0);
            let mut room = running_with(6, &mut rng);
            room.mastermind_id = Some("p1".into());
            room.proposed_team = Some(vec!["p2".into(), "p3".into()]);
            room.status = RoomStatus::InProgress(phase);
            for id in ["p0", "p1", "p2", "p3", "p4", "p5"] {
                room.votes.insert(id.into(), Vote::Approve);
            }

            assert_eq!(room.reconcile_exit("p3", &mut rng), ExitOutcome::Continued(None));
            assert_eq!(room.phase(), Some(Phase::TeamSelection));
            assert_eq!(room.round_number, 2);
            assert!(room.proposed_team.is_none());
            assert!(room.votes.is_empty());
        }
    }

    #[test]
    fn missing_ballot_departure_closes_the_vote() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut room = running_with(6, &mut rng);
        room.proposed_team = Some(vec!["p1".into(), "p2".into()]);
        room.status = RoomStatus::InProgress(Phase::TeamVote);
        for id in ["p0", "p1", "p2", "p3", "p4"] {
            room.votes.insert(id.into(), Vote::Approve);
        }

        let ExitOutcome::Continued(Some(follow_up)) = room.reconcile_exit("p5", &mut rng) else {
            panic!("expected the vote to close");
        };
        assert_eq!(follow_up.kind, DeferredKind::TallyVotes);
        assert_eq!(room.phase(), Some(Phase::VoteReveal));
    }
}
