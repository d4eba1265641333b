use serde::{Deserialize, Serialize};

use crate::state::room::Room;

pub const ROOM_PREFIX: &str = "room::";
pub const PUBLIC_PREFIX: &str = "public::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
}

/// Body CouchDB answers with after a successful write.
#[derive(Debug, Deserialize)]
pub struct WriteResponse {
    pub rev: String,
}

/// Minimal projection used to learn the current revision of any document.
#[derive(Debug, Deserialize)]
pub struct RevisionOnly {
    #[serde(rename = "_rev")]
    pub rev: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchRoomDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub room: Room,
}

/// Marker document advertising a room in the public listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchPublicMarker {
    #[serde(rename = "_id")]
    pub id: String,
    pub room_id: String,
}

pub fn room_doc_id(room_id: &str) -> String {
    format!("{ROOM_PREFIX}{room_id}")
}

pub fn public_doc_id(room_id: &str) -> String {
    format!("{PUBLIC_PREFIX}{room_id}")
}
