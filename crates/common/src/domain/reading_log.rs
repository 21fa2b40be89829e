use crate::domain::reading::RawMessage;
use crate::domain::result::DomainResult;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Where a newly created consumer group starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupStart {
    /// From the first entry, so a fresh group sees historical messages.
    Origin,
    /// Only entries appended after the group is created.
    Latest,
}

/// Which messages a claim asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimPosition {
    /// Messages never delivered to any consumer of the group.
    Undelivered,
    /// This consumer's own pending (delivered, unacknowledged) messages with
    /// IDs strictly greater than the given one.
    PendingAfter(String),
}

impl ClaimPosition {
    /// Start of the consumer's pending list.
    pub fn pending_from_start() -> Self {
        ClaimPosition::PendingAfter("0".to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClaimRequest {
    pub stream: String,
    pub group: String,
    pub consumer: String,
    pub count: usize,
    /// How long to wait for undelivered messages. Ignored for pending claims.
    pub block: Option<Duration>,
    pub position: ClaimPosition,
}

/// Length and boundary entries of a stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StreamStats {
    pub length: usize,
    pub first_entry: Option<RawMessage>,
    pub last_entry: Option<RawMessage>,
}

/// Cursor state of one consumer group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub name: String,
    pub consumers: usize,
    pub pending: usize,
    pub last_delivered_id: String,
}

/// Append-only, ID-ordered message log with competing-consumer groups.
///
/// Within a group each message is delivered to one consumer at a time and
/// stays in that consumer's pending set until acknowledged.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReadingLog: Send + Sync {
    /// Creates `group` on `stream`, creating the stream if needed.
    /// Returns `DomainError::GroupAlreadyExists` when the group is already there.
    async fn ensure_group(&self, stream: &str, group: &str, start: GroupStart) -> DomainResult<()>;

    /// Claims up to `request.count` messages for `request.consumer`.
    /// An empty batch means nothing arrived within the block timeout.
    async fn claim(&self, request: &ClaimRequest) -> DomainResult<Vec<RawMessage>>;

    /// Removes a message from the group's pending set.
    /// Returns `false` if it was not pending.
    async fn acknowledge(&self, stream: &str, group: &str, message_id: &str) -> DomainResult<bool>;

    /// Appends an entry and returns the log-assigned message ID.
    async fn append(&self, stream: &str, fields: Vec<(String, String)>) -> DomainResult<String>;

    async fn stream_stats(&self, stream: &str) -> DomainResult<StreamStats>;

    /// Per-group cursor state. Empty if the stream does not exist.
    async fn group_stats(&self, stream: &str) -> DomainResult<Vec<GroupStats>>;

    async fn ping(&self) -> DomainResult<()>;
}
