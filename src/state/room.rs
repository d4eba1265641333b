use std::time::SystemTime;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::rules;

/// Lifecycle of a room. The gameplay phase only exists while a game is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    /// Players gather, toggle readiness and wait for the host to start.
    Lobby,
    /// A game is running and sits in one of its phases.
    InProgress(Phase),
    /// The game ended, either through a win condition or a termination.
    Finished,
}

/// Fine-grained phase of a running game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Roles were just dealt; agents discover each other.
    AgentReveal,
    /// The Mastermind picks a team for the current mission.
    TeamSelection,
    /// Every player approves or rejects the proposed team.
    TeamVote,
    /// Votes are shown before being tallied.
    VoteReveal,
    /// Team members secretly play their mission cards.
    Mission,
    /// The mission outcome is shown before the next mission starts.
    Reveal,
}

/// Hidden team affiliation dealt at game start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Member of the majority, wants missions to succeed.
    Thief,
    /// Member of the secretly adversarial minority.
    Agent,
}

/// Card played on a mission, also used as the mission outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionCard {
    /// The mission goes as planned.
    Success,
    /// Sabotage.
    Fail,
}

/// Ballot cast on a proposed team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Vote {
    /// Accept the proposed team.
    Approve,
    /// Refuse the proposed team.
    Reject,
}

/// Side that won the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Winner {
    /// Three successful missions.
    Thieves,
    /// Three failed missions or too many rejected teams in a row.
    Agents,
}

/// Participant seated in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Bearer identifier issued when the participant joined.
    pub id: String,
    /// Name shown to the other participants.
    pub display_name: String,
    /// Lobby-only readiness gate.
    pub is_ready: bool,
    /// Whether the participant is still connected to the room.
    pub is_online: bool,
    /// Secret role, dealt at game start.
    pub role: Option<Role>,
    /// Secret card played on the current mission.
    pub mission_choice: Option<MissionCard>,
    /// Cosmetic avatar identifier.
    pub character: String,
    /// Colour used to render the participant's chat messages.
    pub chat_color: String,
}

impl Player {
    /// Build a freshly joined, online and not-yet-ready participant.
    pub fn new(id: String, display_name: String, character: String, chat_color: String) -> Self {
        Self {
            id,
            display_name,
            is_ready: false,
            is_online: true,
            role: None,
            mission_choice: None,
            character,
            chat_color,
        }
    }
}

/// Outcome of a concluded mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MissionRecord {
    /// Index of the mission (1..=5).
    pub mission_number: u8,
    /// Participants that went on the mission.
    pub team: Vec<String>,
    /// Whether the mission succeeded or failed.
    pub result: MissionCard,
    /// Number of fail cards played.
    pub fail_votes: usize,
}

/// Chat line posted by a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// When the server accepted the line.
    pub timestamp: SystemTime,
    /// Author identifier.
    pub sender_id: String,
    /// Author display name at posting time.
    pub sender_name: String,
    /// Author chat color at posting time.
    pub sender_color: String,
    /// Trimmed message body.
    pub message: String,
}

/// Human readable game log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the event happened.
    pub timestamp: SystemTime,
    /// Narration shown to every participant.
    pub message: String,
}

/// Canonical, server-owned record of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Primary key of the room in the record store.
    pub id: String,
    /// Lobby, running phase or finished.
    pub status: RoomStatus,
    /// Participant with privileged lobby control.
    pub host_id: String,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Seated participants keyed by identifier.
    pub players: IndexMap<String, Player>,
    /// Rotation order used to hand over the Mastermind token.
    pub player_order: Vec<String>,
    /// Mission currently attempted (1..=5).
    pub mission_number: u8,
    /// Team proposal attempt for the current mission (1..=5).
    pub round_number: u8,
    /// Participant allowed to propose a team.
    pub mastermind_id: Option<String>,
    /// Team under vote or on mission.
    pub proposed_team: Option<Vec<String>>,
    /// Ballots cast on the proposed team.
    pub votes: IndexMap<String, Vote>,
    /// Concluded missions, oldest first.
    pub mission_history: Vec<MissionRecord>,
    /// Participants who acknowledged the current reveal screen.
    pub acknowledgements: IndexSet<String>,
    /// Winning side, set once the game ends through a win condition.
    pub winner: Option<Winner>,
    /// Chat lines, oldest first.
    pub chat_history: Vec<ChatMessage>,
    /// Public narration of the game, oldest first.
    pub game_log: Vec<LogEntry>,
    /// Whether the room is advertised in the public listing.
    pub is_public: bool,
}

impl Room {
    /// Build a lobby seating only its host.
    pub fn new(id: String, host: Player, is_public: bool) -> Self {
        let host_id = host.id.clone();
        let mut players = IndexMap::new();
        players.insert(host_id.clone(), host);

        Self {
            id,
            status: RoomStatus::Lobby,
            host_id: host_id.clone(),
            created_at: SystemTime::now(),
            players,
            player_order: vec![host_id],
            mission_number: 1,
            round_number: 1,
            mastermind_id: None,
            proposed_team: None,
            votes: IndexMap::new(),
            mission_history: Vec::new(),
            acknowledgements: IndexSet::new(),
            winner: None,
            chat_history: Vec::new(),
            game_log: Vec::new(),
            is_public,
        }
    }

    /// Current gameplay phase, if a game is running.
    pub fn phase(&self) -> Option<Phase> {
        match self.status {
            RoomStatus::InProgress(phase) => Some(phase),
            _ => None,
        }
    }

    /// Append a timestamped line to the game log.
    pub fn log_event(&mut self, message: impl Into<String>) {
        self.game_log.push(LogEntry {
            timestamp: SystemTime::now(),
            message: message.into(),
        });
    }

    /// Display name of a participant, falling back to its identifier.
    pub fn display_name(&self, player_id: &str) -> String {
        self.players
            .get(player_id)
            .map(|player| player.display_name.clone())
            .unwrap_or_else(|| player_id.to_string())
    }

    /// Identifiers of the participants that are still connected.
    pub fn online_ids(&self) -> Vec<String> {
        self.players
            .values()
            .filter(|player| player.is_online)
            .map(|player| player.id.clone())
            .collect()
    }

    /// Number of participants still connected.
    pub fn online_count(&self) -> usize {
        self.players.values().filter(|player| player.is_online).count()
    }

    /// Number of participants dealt a role at game start; drives the rules tables.
    pub fn seated_count(&self) -> usize {
        self.players
            .values()
            .filter(|player| player.role.is_some())
            .count()
    }

    /// Team size required for the current mission.
    pub fn required_team_size(&self) -> Option<usize> {
        rules::team_size(self.seated_count(), self.mission_number)
    }

    /// Number of missions concluded with the given result.
    pub fn missions_with(&self, result: MissionCard) -> usize {
        self.mission_history
            .iter()
            .filter(|mission| mission.result == result)
            .count()
    }

    /// Whether at least one participant is online and every online one satisfies `predicate`.
    pub fn every_online(&self, mut predicate: impl FnMut(&Player) -> bool) -> bool {
        let mut online = self.players.values().filter(|player| player.is_online).peekable();
        online.peek().is_some() && online.all(|player| predicate(player))
    }
}
