use std::time::{Duration, SystemTime};

use rand::{Rng, seq::SliceRandom};
use thiserror::Error;

use crate::{
    config::AppConfig,
    state::{
        room::{ChatMessage, MissionCard, MissionRecord, Phase, Player, Role, Room, RoomStatus, Vote, Winner},
        rotation::{next_mastermind, random_online},
        rules::{self, MAX_PLAYERS, MAX_REJECTIONS, MIN_PLAYERS, MISSIONS_TO_WIN},
    },
};

/// Reveal screen a participant can acknowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealScreen {
    /// Ballots displayed after a team vote.
    Votes,
    /// Mission outcome displayed after every card was played.
    Mission,
}

/// Participant-triggered events applied to a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// A new participant takes a seat in the lobby.
    Join {
        /// Identifier issued to the newcomer.
        player_id: String,
        /// Name shown to the other participants.
        display_name: String,
    },
    /// Flip the caller's lobby readiness.
    ToggleReady {
        /// Acting participant.
        player_id: String,
    },
    /// Host removes a participant from the lobby.
    Kick {
        /// Acting participant, must be the host.
        player_id: String,
        /// Participant to remove.
        target_id: String,
    },
    /// Host deals the roles and starts the game.
    Start {
        /// Acting participant, must be the host.
        player_id: String,
    },
    /// Mastermind proposes a team for the current mission.
    ProposeTeam {
        /// Acting participant, must hold the Mastermind token.
        player_id: String,
        /// Proposed team members.
        team: Vec<String>,
    },
    /// Ballot on the proposed team.
    SubmitVote {
        /// Acting participant.
        player_id: String,
        /// Ballot.
        vote: Vote,
    },
    /// Secret card played by a team member.
    PlayMissionCard {
        /// Acting participant, must be on the team.
        player_id: String,
        /// Card played.
        card: MissionCard,
    },
    /// Participant dismissed a reveal screen.
    Acknowledge {
        /// Acting participant.
        player_id: String,
        /// Screen being dismissed.
        screen: RevealScreen,
    },
    /// Host sends a finished room back to the lobby.
    Reset {
        /// Acting participant, must be the host.
        player_id: String,
    },
    /// Chat line posted by a participant.
    Chat {
        /// Acting participant.
        player_id: String,
        /// Raw message text.
        message: String,
    },
}

/// Automatic transitions fired once a reveal pause elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeferredKind {
    /// AGENT_REVEAL to TEAM_SELECTION with a random first Mastermind.
    ConcludeAgentReveal,
    /// VOTE_REVEAL tally: mission on approval, next round on rejection.
    TallyVotes,
    /// REVEAL to the next mission's TEAM_SELECTION.
    AdvanceMission,
}

impl DeferredKind {
    /// Phase the room must still be in for the transition to apply.
    pub fn expected_phase(self) -> Phase {
        match self {
            Self::ConcludeAgentReveal => Phase::AgentReveal,
            Self::TallyVotes => Phase::VoteReveal,
            Self::AdvanceMission => Phase::Reveal,
        }
    }

    /// Reveal pause preceding the transition.
    pub fn delay(self, config: &AppConfig) -> Duration {
        match self {
            Self::ConcludeAgentReveal => config.agent_reveal_delay,
            Self::TallyVotes => config.vote_reveal_delay,
            Self::AdvanceMission => config.mission_reveal_delay,
        }
    }
}

/// Follow-up transition requested by a committed mutation.
///
/// Identified by the room, its kind and the mission/round it was scheduled in so
/// that a timer outliving its phase cannot be confused with a later one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeferredTransition {
    /// Room the transition belongs to.
    pub room_id: String,
    /// What to do on wake.
    pub kind: DeferredKind,
    /// Mission the room was on when the transition was scheduled.
    pub mission_number: u8,
    /// Round the room was on when the transition was scheduled.
    pub round_number: u8,
}

impl DeferredTransition {
    fn for_room(room: &Room, kind: DeferredKind) -> Self {
        Self {
            room_id: room.id.clone(),
            kind,
            mission_number: room.mission_number,
            round_number: room.round_number,
        }
    }

    /// Whether `room` is still waiting for this transition.
    pub fn still_applies(&self, room: &Room) -> bool {
        room.id == self.room_id
            && room.status == RoomStatus::InProgress(self.kind.expected_phase())
            && room.mission_number == self.mission_number
            && room.round_number == self.round_number
    }
}

/// Rule violations reported when an event cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// Caller is not seated in the room.
    #[error("player `{player_id}` is not part of this room")]
    UnknownPlayer { player_id: String },
    /// Action not allowed in the current status.
    #[error("cannot {action} while the room is {status}")]
    WrongPhase { action: &'static str, status: String },
    /// Host-only action attempted by someone else.
    #[error("only the host can {action}")]
    NotHost { action: &'static str },
    /// Team proposed by someone other than the Mastermind.
    #[error("only the current Mastermind can propose a team")]
    NotMastermind,
    /// Mission card played by a non-member.
    #[error("only members of the proposed team can play a mission card")]
    NotOnTeam,
    /// Thief tried to play FAIL.
    #[error("thieves can only play SUCCESS cards")]
    ThiefCannotFail,
    /// Host tried to kick themselves.
    #[error("the host cannot kick themselves")]
    CannotKickSelf,
    /// Team size does not match the mission.
    #[error("team must have exactly {expected} members (got {actual})")]
    WrongTeamSize { expected: usize, actual: usize },
    /// Same participant listed twice.
    #[error("player `{player_id}` appears more than once in the team")]
    DuplicateTeamMember { player_id: String },
    /// Team member is unknown, unseated or offline.
    #[error("player `{player_id}` cannot be part of the team")]
    UnknownTeamMember { player_id: String },
    /// Chat line is blank after trimming.
    #[error("chat message cannot be empty")]
    EmptyChatMessage,
    /// Chat line exceeds the configured maximum.
    #[error("chat message exceeds {max} characters")]
    ChatMessageTooLong { max: usize },
    /// Second ballot from the same participant.
    #[error("player has already voted")]
    AlreadyVoted,
    /// Second mission card from the same member.
    #[error("player has already played a mission card")]
    AlreadyPlayed,
    /// Lobby already seats the maximum.
    #[error("lobby is full ({max} players)")]
    LobbyFull { max: usize },
    /// Join attempted after the game started.
    #[error("game has already started")]
    AlreadyStarted,
    /// Online count outside the playable range.
    #[error("need between {min} and {max} online players to start (got {online})")]
    NotEnoughPlayers { min: usize, max: usize, online: usize },
    /// Someone online is not ready.
    #[error("all online players must be ready")]
    PlayersNotReady,
}

impl Room {
    /// Validate `event` against the current state and apply it.
    ///
    /// Returns the automatic follow-up the mutation unblocked, if any. The room is
    /// left untouched when an error is returned.
    pub fn apply<R: Rng + ?Sized>(
        &mut self,
        event: RoomEvent,
        config: &AppConfig,
        rng: &mut R,
    ) -> Result<Option<DeferredTransition>, TransitionError> {
        match event {
            RoomEvent::Join {
                player_id,
                display_name,
            } => self.join(player_id, display_name, config, rng).map(|_| None),
            RoomEvent::ToggleReady { player_id } => self.toggle_ready(&player_id).map(|_| None),
            RoomEvent::Kick {
                player_id,
                target_id,
            } => self.kick(&player_id, &target_id).map(|_| None),
            RoomEvent::Start { player_id } => self.start(&player_id, rng).map(Some),
            RoomEvent::ProposeTeam { player_id, team } => {
                self.propose_team(&player_id, team).map(|_| None)
            }
            RoomEvent::SubmitVote { player_id, vote } => self.submit_vote(&player_id, vote),
            RoomEvent::PlayMissionCard { player_id, card } => {
                self.play_mission_card(&player_id, card)
            }
            RoomEvent::Acknowledge { player_id, screen } => {
                self.acknowledge(&player_id, screen, rng)
            }
            RoomEvent::Reset { player_id } => self.reset(&player_id).map(|_| None),
            RoomEvent::Chat { player_id, message } => {
                self.chat(&player_id, &message, config).map(|_| None)
            }
        }
    }

    /// Apply a deferred transition whose precondition has already been checked.
    ///
    /// Returns the follow-up to schedule, if any.
    pub fn resolve<R: Rng + ?Sized>(
        &mut self,
        kind: DeferredKind,
        rng: &mut R,
    ) -> Option<DeferredTransition> {
        match kind {
            DeferredKind::ConcludeAgentReveal => {
                self.mastermind_id = random_online(self, rng);
                self.status = RoomStatus::InProgress(Phase::TeamSelection);
                let name = self.mastermind_name();
                self.log_event(format!(
                    "Agents have been revealed. The first Mastermind is {name}."
                ));
            }
            DeferredKind::TallyVotes => self.tally_votes(rng),
            DeferredKind::AdvanceMission => {
                self.mission_number += 1;
                self.round_number = 1;
                self.clear_round();
                self.rotate_mastermind(rng);
                self.status = RoomStatus::InProgress(Phase::TeamSelection);
                let (mission, name) = (self.mission_number, self.mastermind_name());
                self.log_event(format!(
                    "Mission {mission} begins. {name} is the new Mastermind."
                ));
            }
        }
        None
    }

    /// Hand the Mastermind token to the next online participant in rotation order.
    pub fn rotate_mastermind<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.mastermind_id = next_mastermind(self, rng);
    }

    /// Abandon the current mission and move on to the next team proposal.
    ///
    /// Counts as a failed proposal: when the round limit is already reached the agents win.
    pub fn abort_mission<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.log_event("Mission aborted because a team member went offline.");
        self.next_round(rng);
    }

    fn join<R: Rng + ?Sized>(
        &mut self,
        player_id: String,
        display_name: String,
        config: &AppConfig,
        rng: &mut R,
    ) -> Result<(), TransitionError> {
        if self.status != RoomStatus::Lobby {
            return Err(TransitionError::AlreadyStarted);
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(TransitionError::LobbyFull { max: MAX_PLAYERS });
        }

        let (character, chat_color) = {
            let characters: Vec<&str> = self.players.values().map(|p| p.character.as_str()).collect();
            let colors: Vec<&str> = self.players.values().map(|p| p.chat_color.as_str()).collect();
            (
                config.first_unused_character(&characters, rng),
                config.first_unused_chat_color(&colors, rng),
            )
        };

        self.log_event(format!("{display_name} has joined the game."));
        let player = Player::new(player_id.clone(), display_name, character, chat_color);
        self.players.insert(player_id.clone(), player);
        if !self.player_order.contains(&player_id) {
            self.player_order.push(player_id);
        }
        Ok(())
    }

    fn toggle_ready(&mut self, player_id: &str) -> Result<(), TransitionError> {
        self.require_lobby("change readiness")?;
        let player = self.player_mut(player_id)?;
        player.is_ready = !player.is_ready;
        Ok(())
    }

    fn kick(&mut self, player_id: &str, target_id: &str) -> Result<(), TransitionError> {
        self.require_host(player_id, "kick players")?;
        self.require_lobby("kick players")?;
        if !self.players.contains_key(target_id) {
            return Err(unknown(target_id));
        }
        if player_id == target_id {
            return Err(TransitionError::CannotKickSelf);
        }

        let name = self.display_name(target_id);
        self.players.shift_remove(target_id);
        self.player_order.retain(|id| id != target_id);
        self.log_event(format!("{name} was kicked by the host."));
        Ok(())
    }

    fn start<R: Rng + ?Sized>(
        &mut self,
        player_id: &str,
        rng: &mut R,
    ) -> Result<DeferredTransition, TransitionError> {
        self.require_host(player_id, "start the game")?;
        if self.status != RoomStatus::Lobby {
            return Err(TransitionError::AlreadyStarted);
        }
        let online = self.online_count();
        let balance = rules::role_balance(online).ok_or(TransitionError::NotEnoughPlayers {
            min: MIN_PLAYERS,
            max: MAX_PLAYERS,
            online,
        })?;
        if !self.every_online(|player| player.is_ready) {
            return Err(TransitionError::PlayersNotReady);
        }

        let mut dealt = self.online_ids();
        dealt.shuffle(rng);
        for player in self.players.values_mut() {
            player.role = None;
            player.mission_choice = None;
            player.is_ready = false;
        }
        for (index, id) in dealt.iter().enumerate() {
            if let Some(player) = self.players.get_mut(id) {
                player.role = Some(if index < balance.agents {
                    Role::Agent
                } else {
                    Role::Thief
                });
            }
        }

        self.mission_number = 1;
        self.round_number = 1;
        self.mastermind_id = None;
        self.mission_history.clear();
        self.winner = None;
        self.clear_round();
        self.status = RoomStatus::InProgress(Phase::AgentReveal);
        self.log_event("The game has started! Assigning roles...");
        Ok(DeferredTransition::for_room(self, DeferredKind::ConcludeAgentReveal))
    }

    fn propose_team(&mut self, player_id: &str, team: Vec<String>) -> Result<(), TransitionError> {
        self.require_phase(Phase::TeamSelection, "propose a team")?;
        if self.mastermind_id.as_deref() != Some(player_id) {
            return Err(TransitionError::NotMastermind);
        }

        let expected = self.required_team_size().unwrap_or_default();
        if team.len() != expected {
            return Err(TransitionError::WrongTeamSize {
                expected,
                actual: team.len(),
            });
        }
        for (index, member) in team.iter().enumerate() {
            if team[..index].contains(member) {
                return Err(TransitionError::DuplicateTeamMember {
                    player_id: member.clone(),
                });
            }
            if self
                .players
                .get(member)
                .is_none_or(|player| player.role.is_none() || !player.is_online)
            {
                return Err(TransitionError::UnknownTeamMember {
                    player_id: member.clone(),
                });
            }
        }

        let names: Vec<String> = team.iter().map(|id| self.display_name(id)).collect();
        let mastermind = self.display_name(player_id);
        self.log_event(format!("{mastermind} proposed a team: {}.", names.join(", ")));
        self.proposed_team = Some(team);
        self.votes.clear();
        self.status = RoomStatus::InProgress(Phase::TeamVote);
        Ok(())
    }

    fn submit_vote(
        &mut self,
        player_id: &str,
        vote: Vote,
    ) -> Result<Option<DeferredTransition>, TransitionError> {
        self.require_phase(Phase::TeamVote, "vote")?;
        self.player(player_id)?;
        if self.votes.contains_key(player_id) {
            return Err(TransitionError::AlreadyVoted);
        }

        self.votes.insert(player_id.to_string(), vote);
        Ok(self.close_vote_if_complete())
    }

    /// Move to VOTE_REVEAL once every online participant has voted.
    pub(crate) fn close_vote_if_complete(&mut self) -> Option<DeferredTransition> {
        if self.phase() != Some(Phase::TeamVote)
            || !self.every_online(|player| self.votes.contains_key(&player.id))
        {
            return None;
        }
        self.acknowledgements.clear();
        self.status = RoomStatus::InProgress(Phase::VoteReveal);
        Some(DeferredTransition::for_room(self, DeferredKind::TallyVotes))
    }

    fn play_mission_card(
        &mut self,
        player_id: &str,
        card: MissionCard,
    ) -> Result<Option<DeferredTransition>, TransitionError> {
        self.require_phase(Phase::Mission, "play a mission card")?;
        let team = self.proposed_team.clone().unwrap_or_default();
        if !team.iter().any(|member| member == player_id) {
            return Err(TransitionError::NotOnTeam);
        }
        let player = self.player_mut(player_id)?;
        if player.mission_choice.is_some() {
            return Err(TransitionError::AlreadyPlayed);
        }
        if player.role == Some(Role::Thief) && card == MissionCard::Fail {
            return Err(TransitionError::ThiefCannotFail);
        }
        player.mission_choice = Some(card);

        let played: Vec<MissionCard> = team
            .iter()
            .filter_map(|member| self.players.get(member).and_then(|p| p.mission_choice))
            .collect();
        if played.len() < team.len() {
            return Ok(None);
        }

        let fail_votes = played.iter().filter(|card| **card == MissionCard::Fail).count();
        let result = if fail_votes >= rules::fails_required(self.seated_count(), self.mission_number) {
            MissionCard::Fail
        } else {
            MissionCard::Success
        };
        self.mission_history.push(MissionRecord {
            mission_number: self.mission_number,
            team,
            result,
            fail_votes,
        });
        let (mission, outcome) = match result {
            MissionCard::Success => (self.mission_number, "succeeded"),
            MissionCard::Fail => (self.mission_number, "failed"),
        };
        self.log_event(format!(
            "Mission {mission} {outcome} with {fail_votes} fail card(s)."
        ));
        self.acknowledgements.clear();

        if self.missions_with(MissionCard::Success) >= MISSIONS_TO_WIN {
            self.log_event("Thieves have completed 3 missions successfully!");
            self.finish(Winner::Thieves);
            return Ok(None);
        }
        if self.missions_with(MissionCard::Fail) >= MISSIONS_TO_WIN {
            self.log_event("Agents have sabotaged 3 missions!");
            self.finish(Winner::Agents);
            return Ok(None);
        }

        self.status = RoomStatus::InProgress(Phase::Reveal);
        Ok(Some(DeferredTransition::for_room(self, DeferredKind::AdvanceMission)))
    }

    fn acknowledge<R: Rng + ?Sized>(
        &mut self,
        player_id: &str,
        screen: RevealScreen,
        rng: &mut R,
    ) -> Result<Option<DeferredTransition>, TransitionError> {
        let (phase, kind) = match screen {
            RevealScreen::Votes => (Phase::VoteReveal, DeferredKind::TallyVotes),
            RevealScreen::Mission => (Phase::Reveal, DeferredKind::AdvanceMission),
        };
        self.require_phase(phase, "acknowledge this screen")?;
        self.player(player_id)?;
        self.acknowledgements.insert(player_id.to_string());

        if self.every_online(|player| self.acknowledgements.contains(&player.id)) {
            return Ok(self.resolve(kind, rng));
        }
        Ok(None)
    }

    fn reset(&mut self, player_id: &str) -> Result<(), TransitionError> {
        self.require_host(player_id, "reset the game")?;
        if self.status != RoomStatus::Finished {
            return Err(self.wrong_phase("reset the game"));
        }

        for player in self.players.values_mut() {
            player.role = None;
            player.mission_choice = None;
            player.is_ready = player.id == self.host_id;
        }
        self.status = RoomStatus::Lobby;
        self.mission_number = 1;
        self.round_number = 1;
        self.mastermind_id = None;
        self.mission_history.clear();
        self.winner = None;
        self.clear_round();
        let host = self.display_name(&self.host_id);
        self.log_event(format!("Host {host} has reset the game for a new round."));
        Ok(())
    }

    fn chat(&mut self, player_id: &str, message: &str, config: &AppConfig) -> Result<(), TransitionError> {
        let sender = self.player(player_id)?;
        let message = message.trim();
        if message.is_empty() {
            return Err(TransitionError::EmptyChatMessage);
        }
        if message.chars().count() > config.max_chat_length {
            return Err(TransitionError::ChatMessageTooLong {
                max: config.max_chat_length,
            });
        }

        let entry = ChatMessage {
            timestamp: SystemTime::now(),
            sender_id: sender.id.clone(),
            sender_name: sender.display_name.clone(),
            sender_color: sender.chat_color.clone(),
            message: message.to_string(),
        };
        self.chat_history.push(entry);
        Ok(())
    }

    fn tally_votes<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        // Seats without a ballot count against the team.
        let approvals = self.votes.values().filter(|vote| **vote == Vote::Approve).count();
        let rejections = self.seated_count().saturating_sub(approvals);
        self.acknowledgements.clear();

        let team_offline = self.proposed_team.as_ref().is_some_and(|team| {
            team.iter()
                .any(|member| self.players.get(member).is_none_or(|player| !player.is_online))
        });
        if approvals > rejections && team_offline {
            self.log_event(format!("Team approved ({approvals}-{rejections})."));
            self.abort_mission(rng);
        } else if approvals > rejections {
            self.log_event(format!(
                "Team approved ({approvals}-{rejections}). Mission starting."
            ));
            self.votes.clear();
            let team = self.proposed_team.clone().unwrap_or_default();
            for member in &team {
                if let Some(player) = self.players.get_mut(member) {
                    player.mission_choice = None;
                }
            }
            self.status = RoomStatus::InProgress(Phase::Mission);
        } else {
            self.log_event(format!("Team rejected ({approvals}-{rejections})."));
            self.next_round(rng);
        }
    }

    /// Move on to the next proposal of the current mission, or end the game when
    /// the vote track is exhausted.
    fn next_round<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.clear_round();
        if self.round_number >= MAX_REJECTIONS {
            self.log_event("Team rejected 5 times in a row. Agents win!");
            self.finish(Winner::Agents);
            return;
        }
        self.round_number += 1;
        self.rotate_mastermind(rng);
        self.status = RoomStatus::InProgress(Phase::TeamSelection);
        let name = self.mastermind_name();
        self.log_event(format!("{name} is the new Mastermind."));
    }

    fn finish(&mut self, winner: Winner) {
        self.winner = Some(winner);
        self.status = RoomStatus::Finished;
    }

    /// Forget everything tied to the current team proposal.
    fn clear_round(&mut self) {
        self.proposed_team = None;
        self.votes.clear();
        self.acknowledgements.clear();
        for player in self.players.values_mut() {
            player.mission_choice = None;
        }
    }

    fn mastermind_name(&self) -> String {
        self.mastermind_id
            .as_deref()
            .map(|id| self.display_name(id))
            .unwrap_or_else(|| "nobody".into())
    }

    fn player(&self, player_id: &str) -> Result<&Player, TransitionError> {
        self.players.get(player_id).ok_or_else(|| unknown(player_id))
    }

    fn player_mut(&mut self, player_id: &str) -> Result<&mut Player, TransitionError> {
        self.players.get_mut(player_id).ok_or_else(|| unknown(player_id))
    }

    fn require_host(&self, player_id: &str, action: &'static str) -> Result<(), TransitionError> {
        if self.host_id == player_id {
            Ok(())
        } else {
            Err(TransitionError::NotHost { action })
        }
    }

    fn require_lobby(&self, action: &'static str) -> Result<(), TransitionError> {
        if self.status == RoomStatus::Lobby {
            Ok(())
        } else {
            Err(self.wrong_phase(action))
        }
    }

    fn require_phase(&self, phase: Phase, action: &'static str) -> Result<(), TransitionError> {
        if self.phase() == Some(phase) {
            Ok(())
        } else {
            Err(self.wrong_phase(action))
        }
    }

    fn wrong_phase(&self, action: &'static str) -> TransitionError {
        let status = match self.status {
            RoomStatus::Lobby => "in the lobby".to_string(),
            RoomStatus::InProgress(phase) => format!("in phase {phase:?}"),
            RoomStatus::Finished => "finished".to_string(),
        };
        TransitionError::WrongPhase { action, status }
    }
}

fn unknown(player_id: &str) -> TransitionError {
    TransitionError::UnknownPlayer {
        player_id: player_id.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    pub(crate) fn lobby_with(count: usize) -> Room {
        let config = AppConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        let host = Player::new("p0".into(), "Player 0".into(), "char1".into(), "#82c9ff".into());
        let mut room = Room::new("room".into(), host, false);
        room.players["p0"].is_ready = true;
        for index in 1..count {
            room.apply(
                RoomEvent::Join {
                    player_id: format!("p{index}"),
                    display_name: format!("Player {index}"),
                },
                &config,
                &mut rng,
            )
            .unwrap();
            room.players[index].is_ready = true;
        }
        room
    }

    /// Start a game and fire the agent reveal so it sits in TEAM_SELECTION.
    pub(crate) fn running_with(count: usize, rng: &mut StdRng) -> Room {
        let mut room = lobby_with(count);
        let config = AppConfig::default();
        room.apply(
            RoomEvent::Start {
                player_id: "p0".into(),
            },
            &config,
            rng,
        )
        .unwrap();
        room.resolve(DeferredKind::ConcludeAgentReveal, rng);
        room
    }

    fn ids_with_role(room: &Room, role: Role) -> Vec<String> {
        room.players
            .values()
            .filter(|player| player.role == Some(role))
            .map(|player| player.id.clone())
            .collect()
    }

    fn propose(room: &mut Room, team: Vec<String>, rng: &mut StdRng) {
        let mastermind = room.mastermind_id.clone().unwrap();
        room.apply(
            RoomEvent::ProposeTeam {
                player_id: mastermind,
                team,
            },
            &AppConfig::default(),
            rng,
        )
        .unwrap();
    }

    fn vote_all(room: &mut Room, vote: Vote, rng: &mut StdRng) -> Option<DeferredTransition> {
        let mut follow_up = None;
        for id in room.online_ids() {
            follow_up = room
                .apply(
                    RoomEvent::SubmitVote { player_id: id, vote },
                    &AppConfig::default(),
                    rng,
                )
                .unwrap();
        }
        follow_up
    }

    #[test]
    fn join_assigns_first_unused_cosmetics_and_caps_lobby() {
        let mut room = lobby_with(MAX_PLAYERS);
        assert_eq!(room.players["p1"].character, "char2");
        assert_eq!(room.players["p1"].chat_color, "#a6e22e");
        assert_eq!(room.player_order.len(), MAX_PLAYERS);

        let err = room
            .apply(
                RoomEvent::Join {
                    player_id: "late".into(),
                    display_name: "Late".into(),
                },
                &AppConfig::default(),
                &mut StdRng::seed_from_u64(0),
            )
            .unwrap_err();
        assert_eq!(err, TransitionError::LobbyFull { max: MAX_PLAYERS });
    }

    #[test]
    fn start_deals_roles_per_balance_table() {
        for count in MIN_PLAYERS..=MAX_PLAYERS {
            let mut rng = StdRng::seed_from_u64(count as u64);
            let mut room = lobby_with(count);
            let follow_up = room
                .apply(
                    RoomEvent::Start {
                        player_id: "p0".into(),
                    },
                    &AppConfig::default(),
                    &mut rng,
                )
                .unwrap()
                .unwrap();

            let balance = rules::role_balance(count).unwrap();
            assert_eq!(ids_with_role(&room, Role::Agent).len(), balance.agents);
            assert_eq!(ids_with_role(&room, Role::Thief).len(), balance.thieves);
            assert!(room.players.values().all(|player| !player.is_ready));
            assert_eq!(room.status, RoomStatus::InProgress(Phase::AgentReveal));
            assert_eq!(follow_up.kind, DeferredKind::ConcludeAgentReveal);
        }
    }

    #[test]
    fn start_checks_host_count_and_readiness() {
        let config = AppConfig::default();
        let mut rng = StdRng::seed_from_u64(1);

        let mut room = lobby_with(4);
        let start = |player_id: &str| RoomEvent::Start {
            player_id: player_id.into(),
        };
        assert!(matches!(
            room.apply(start("p0"), &config, &mut rng),
            Err(TransitionError::NotEnoughPlayers { online: 4, .. })
        ));

        let mut room = lobby_with(5);
        assert!(matches!(
            room.apply(start("p1"), &config, &mut rng),
            Err(TransitionError::NotHost { .. })
        ));
        room.players["p3"].is_ready = false;
        assert_eq!(
            room.apply(start("p0"), &config, &mut rng),
            Err(TransitionError::PlayersNotReady)
        );
        room.players["p3"].is_online = false;
        room.players["p4"].is_online = false;
        assert!(matches!(
            room.apply(start("p0"), &config, &mut rng),
            Err(TransitionError::NotEnoughPlayers { online: 3, .. })
        ));
    }

    #[test]
    fn kick_removes_player_from_roster_and_order() {
        let config = AppConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut room = lobby_with(3);

        let err = room
            .apply(
                RoomEvent::Kick {
                    player_id: "p0".into(),
                    target_id: "p0".into(),
                },
                &config,
                &mut rng,
            )
            .unwrap_err();
        assert_eq!(err, TransitionError::CannotKickSelf);

        room.apply(
            RoomEvent::Kick {
                player_id: "p0".into(),
                target_id: "p1".into(),
            },
            &config,
            &mut rng,
        )
        .unwrap();
        assert!(!room.players.contains_key("p1"));
        assert_eq!(room.player_order, vec!["p0".to_string(), "p2".to_string()]);
        assert_eq!(
            room.game_log.last().unwrap().message,
            "Player 1 was kicked by the host."
        );
    }

    #[test]
    fn propose_team_validates_size_members_and_caller() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut room = running_with(5, &mut rng);
        let config = AppConfig::default();
        let mastermind = room.mastermind_id.clone().unwrap();
        let other = room
            .online_ids()
            .into_iter()
            .find(|id| *id != mastermind)
            .unwrap();
        let propose = |player_id: &str, team: &[&str]| RoomEvent::ProposeTeam {
            player_id: player_id.into(),
            team: team.iter().map(|id| id.to_string()).collect(),
        };

        assert_eq!(
            room.apply(propose(other.as_str(), &["p0", "p1"]), &config, &mut rng),
            Err(TransitionError::NotMastermind)
        );
        assert_eq!(
            room.apply(propose(mastermind.as_str(), &["p0", "p1", "p2"]), &config, &mut rng),
            Err(TransitionError::WrongTeamSize {
                expected: 2,
                actual: 3
            })
        );
        assert!(matches!(
            room.apply(propose(mastermind.as_str(), &["p1", "p1"]), &config, &mut rng),
            Err(TransitionError::DuplicateTeamMember { .. })
        ));
        assert!(matches!(
            room.apply(propose(mastermind.as_str(), &["p1", "ghost"]), &config, &mut rng),
            Err(TransitionError::UnknownTeamMember { .. })
        ));

        room.apply(propose(mastermind.as_str(), &["p1", "p2"]), &config, &mut rng)
            .unwrap();
        assert_eq!(room.phase(), Some(Phase::TeamVote));
        assert_eq!(room.proposed_team.as_deref().map(<[String]>::len), Some(2));
    }

    #[test]
    fn last_vote_opens_the_reveal_and_duplicate_vote_conflicts() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut room = running_with(5, &mut rng);
        propose(&mut room, vec!["p0".into(), "p1".into()], &mut rng);
        let config = AppConfig::default();

        room.apply(
            RoomEvent::SubmitVote {
                player_id: "p0".into(),
                vote: Vote::Approve,
            },
            &config,
            &mut rng,
        )
        .unwrap();
        assert_eq!(
            room.apply(
                RoomEvent::SubmitVote {
                    player_id: "p0".into(),
                    vote: Vote::Reject,
                },
                &config,
                &mut rng,
            ),
            Err(TransitionError::AlreadyVoted)
        );

        let mut follow_up = None;
        for id in ["p1", "p2", "p3", "p4"] {
            follow_up = room
                .apply(
                    RoomEvent::SubmitVote {
                        player_id: id.into(),
                        vote: Vote::Approve,
                    },
                    &config,
                    &mut rng,
                )
                .unwrap();
        }
        let follow_up = follow_up.unwrap();
        assert_eq!(follow_up.kind, DeferredKind::TallyVotes);
        assert_eq!(room.phase(), Some(Phase::VoteReveal));
        assert!(follow_up.still_applies(&room));

        room.resolve(follow_up.kind, &mut rng);
        assert_eq!(room.phase(), Some(Phase::Mission));
        assert!(!follow_up.still_applies(&room));
    }

    #[test]
    fn tied_vote_counts_as_rejection() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut room = running_with(6, &mut rng);
        room.status = RoomStatus::InProgress(Phase::VoteReveal);
        for (index, id) in room.online_ids().into_iter().enumerate() {
            let vote = if index % 2 == 0 { Vote::Approve } else { Vote::Reject };
            room.votes.insert(id, vote);
        }

        room.resolve(DeferredKind::TallyVotes, &mut rng);
        assert_eq!(room.phase(), Some(Phase::TeamSelection));
        assert_eq!(room.round_number, 2);
        assert!(room.votes.is_empty());
    }

    #[test]
    fn missing_ballots_count_as_rejections() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut room = running_with(6, &mut rng);
        room.proposed_team = Some(vec!["p1".into(), "p2".into()]);
        room.status = RoomStatus::InProgress(Phase::VoteReveal);
        room.players["p5"].is_online = false;
        for id in ["p0", "p1", "p2"] {
            room.votes.insert(id.into(), Vote::Approve);
        }
        for id in ["p3", "p4"] {
            room.votes.insert(id.into(), Vote::Reject);
        }

        room.resolve(DeferredKind::TallyVotes, &mut rng);
        assert_eq!(room.phase(), Some(Phase::TeamSelection));
        assert_eq!(
            room.game_log.iter().rev().nth(1).unwrap().message,
            "Team rejected (3-3)."
        );
    }

    #[test]
    fn approved_team_with_offline_member_is_aborted() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut room = running_with(6, &mut rng);
        room.proposed_team = Some(vec!["p1".into(), "p2".into()]);
        room.status = RoomStatus::InProgress(Phase::VoteReveal);
        for id in room.online_ids() {
            room.votes.insert(id, Vote::Approve);
        }
        room.players["p2"].is_online = false;

        room.resolve(DeferredKind::TallyVotes, &mut rng);
        assert_eq!(room.phase(), Some(Phase::TeamSelection));
        assert_eq!(room.round_number, 2);
        assert!(room.proposed_team.is_none());
    }

    #[test]
    fn offline_player_cannot_be_proposed() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut room = running_with(6, &mut rng);
        let mastermind = room.mastermind_id.clone().unwrap();
        let offline = room
            .online_ids()
            .into_iter()
            .find(|id| *id != mastermind)
            .unwrap();
        room.players[offline.as_str()].is_online = false;

        let err = room
            .apply(
                RoomEvent::ProposeTeam {
                    player_id: mastermind.clone(),
                    team: vec![mastermind, offline.clone()],
                },
                &AppConfig::default(),
                &mut rng,
            )
            .unwrap_err();
        assert_eq!(err, TransitionError::UnknownTeamMember { player_id: offline });
    }

    #[test]
    fn five_rejections_in_a_row_hand_victory_to_agents() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut room = running_with(5, &mut rng);

        for round in 1..=MAX_REJECTIONS {
            assert_eq!(room.round_number, round);
            let mastermind = room.mastermind_id.clone().unwrap();
            let partner = room
                .online_ids()
                .into_iter()
                .find(|id| *id != mastermind)
                .unwrap();
            propose(&mut room, vec![mastermind, partner], &mut rng);
            let follow_up = vote_all(&mut room, Vote::Reject, &mut rng).unwrap();
            room.resolve(follow_up.kind, &mut rng);
        }

        assert_eq!(room.status, RoomStatus::Finished);
        assert_eq!(room.winner, Some(Winner::Agents));
        assert!(room.mission_history.is_empty());
        assert_eq!(room.round_number, MAX_REJECTIONS);
    }

    #[test]
    fn thief_cannot_play_fail() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut room = running_with(5, &mut rng);
        let thief = ids_with_role(&room, Role::Thief).remove(0);
        let agent = ids_with_role(&room, Role::Agent).remove(0);
        room.proposed_team = Some(vec![thief.clone(), agent.clone()]);
        room.status = RoomStatus::InProgress(Phase::Mission);
        let config = AppConfig::default();

        let err = room
            .apply(
                RoomEvent::PlayMissionCard {
                    player_id: thief.clone(),
                    card: MissionCard::Fail,
                },
                &config,
                &mut rng,
            )
            .unwrap_err();
        assert_eq!(err, TransitionError::ThiefCannotFail);
        assert!(room.players[&thief].mission_choice.is_none());

        let outsider = room
            .online_ids()
            .into_iter()
            .find(|id| *id != thief && *id != agent)
            .unwrap();
        assert_eq!(
            room.apply(
                RoomEvent::PlayMissionCard {
                    player_id: outsider,
                    card: MissionCard::Success,
                },
                &config,
                &mut rng,
            ),
            Err(TransitionError::NotOnTeam)
        );

        room.apply(
            RoomEvent::PlayMissionCard {
                player_id: agent.clone(),
                card: MissionCard::Fail,
            },
            &config,
            &mut rng,
        )
        .unwrap();
        assert_eq!(
            room.apply(
                RoomEvent::PlayMissionCard {
                    player_id: agent,
                    card: MissionCard::Success,
                },
                &config,
                &mut rng,
            ),
            Err(TransitionError::AlreadyPlayed)
        );
    }

    #[test]
    fn large_fourth_mission_needs_two_fails() {
        for (count, expected) in [(7, MissionCard::Success), (5, MissionCard::Fail)] {
            let mut rng = StdRng::seed_from_u64(4);
            let mut room = running_with(count, &mut rng);
            room.mission_number = 4;
            let agent = ids_with_role(&room, Role::Agent).remove(0);
            let mut team = ids_with_role(&room, Role::Thief);
            team.truncate(room.required_team_size().unwrap() - 1);
            team.push(agent.clone());
            room.proposed_team = Some(team.clone());
            room.status = RoomStatus::InProgress(Phase::Mission);

            let mut follow_up = None;
            for member in team {
                let card = if member == agent {
                    MissionCard::Fail
                } else {
                    MissionCard::Success
                };
                follow_up = room
                    .apply(
                        RoomEvent::PlayMissionCard {
                            player_id: member,
                            card,
                        },
                        &AppConfig::default(),
                        &mut rng,
                    )
                    .unwrap();
            }

            let record = room.mission_history.last().unwrap();
            assert_eq!(record.result, expected);
            assert_eq!(record.fail_votes, 1);
            assert_eq!(room.phase(), Some(Phase::Reveal));
            assert_eq!(follow_up.unwrap().kind, DeferredKind::AdvanceMission);
        }
    }

    #[test]
    fn third_success_finishes_without_follow_up() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut room = running_with(5, &mut rng);
        for mission_number in 1..=2 {
            room.mission_history.push(MissionRecord {
                mission_number,
                team: vec![],
                result: MissionCard::Success,
                fail_votes: 0,
            });
        }
        room.mission_number = 3;
        let team = ids_with_role(&room, Role::Thief)[..2].to_vec();
        room.proposed_team = Some(team.clone());
        room.status = RoomStatus::InProgress(Phase::Mission);

        let mut follow_up = None;
        for member in team {
            follow_up = room
                .apply(
                    RoomEvent::PlayMissionCard {
                        player_id: member,
                        card: MissionCard::Success,
                    },
                    &AppConfig::default(),
                    &mut rng,
                )
                .unwrap();
        }
        assert!(follow_up.is_none());
        assert_eq!(room.status, RoomStatus::Finished);
        assert_eq!(room.winner, Some(Winner::Thieves));
    }

    #[test]
    fn advance_mission_rotates_and_resets_round() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut room = running_with(5, &mut rng);
        let first = room.mastermind_id.clone().unwrap();
        room.round_number = 3;
        room.status = RoomStatus::InProgress(Phase::Reveal);
        room.proposed_team = Some(vec!["p0".into(), "p1".into()]);

        room.resolve(DeferredKind::AdvanceMission, &mut rng);
        assert_eq!(room.mission_number, 2);
        assert_eq!(room.round_number, 1);
        assert_eq!(room.phase(), Some(Phase::TeamSelection));
        assert!(room.proposed_team.is_none());
        assert_ne!(room.mastermind_id.as_deref(), Some(first.as_str()));
    }

    #[test]
    fn acknowledgements_resolve_early_once_everyone_agreed() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut room = running_with(5, &mut rng);
        room.status = RoomStatus::InProgress(Phase::Reveal);
        let config = AppConfig::default();
        let ids = room.online_ids();

        for id in &ids[..4] {
            room.apply(
                RoomEvent::Acknowledge {
                    player_id: id.clone(),
                    screen: RevealScreen::Mission,
                },
                &config,
                &mut rng,
            )
            .unwrap();
        }
        assert_eq!(room.phase(), Some(Phase::Reveal));
        assert!(matches!(
            room.apply(
                RoomEvent::Acknowledge {
                    player_id: ids[4].clone(),
                    screen: RevealScreen::Votes,
                },
                &config,
                &mut rng,
            ),
            Err(TransitionError::WrongPhase { .. })
        ));

        room.apply(
            RoomEvent::Acknowledge {
                player_id: ids[4].clone(),
                screen: RevealScreen::Mission,
            },
            &config,
            &mut rng,
        )
        .unwrap();
        assert_eq!(room.phase(), Some(Phase::TeamSelection));
        assert_eq!(room.mission_number, 2);
    }

    #[test]
    fn reset_returns_finished_room_to_lobby() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut room = running_with(5, &mut rng);
        let config = AppConfig::default();
        let reset = RoomEvent::Reset {
            player_id: "p0".into(),
        };
        assert!(matches!(
            room.apply(reset.clone(), &config, &mut rng),
            Err(TransitionError::WrongPhase { .. })
        ));

        room.finish(Winner::Agents);
        room.apply(reset, &config, &mut rng).unwrap();
        assert_eq!(room.status, RoomStatus::Lobby);
        assert!(room.winner.is_none());
        assert!(room.mastermind_id.is_none());
        assert!(room.players.values().all(|player| player.role.is_none()));
        assert_eq!(room.players.len(), 5);
        assert!(room.players["p0"].is_ready);
    }

    #[test]
    fn chat_trims_and_bounds_messages() {
        let mut room = lobby_with(2);
        let config = AppConfig::default();
        let mut rng = StdRng::seed_from_u64(0);
        let chat = |message: String| RoomEvent::Chat {
            player_id: "p1".into(),
            message,
        };

        assert_eq!(
            room.apply(chat("   ".into()), &config, &mut rng),
            Err(TransitionError::EmptyChatMessage)
        );
        assert_eq!(
            room.apply(chat("x".repeat(201)), &config, &mut rng),
            Err(TransitionError::ChatMessageTooLong { max: 200 })
        );
        room.apply(chat("  hello  ".into()), &config, &mut rng)
            .unwrap();

        let line = room.chat_history.last().unwrap();
        assert_eq!(line.message, "hello");
        assert_eq!(line.sender_name, "Player 1");
        assert_eq!(line.sender_color, "#a6e22e");
    }
}
