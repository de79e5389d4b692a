/// Zone, position, link and template identities are UUIDs minted locally.
pub type EntityId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Mint a fresh identity for a locally created record.
pub fn new_id() -> EntityId {
    uuid::Uuid::new_v4()
}
