use crate::domain::{
    ClaimPosition, ClaimRequest, DomainError, DomainResult, GroupStart, GroupStats, RawMessage,
    ReadingLog, StreamStats,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::ops::Bound;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

/// `<millis>-<seq>` entry ID, ordered like Redis stream IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct EntryId {
    millis: u64,
    seq: u64,
}

impl EntryId {
    fn parse(id: &str) -> Option<Self> {
        match id.split_once('-') {
            Some((millis, seq)) => Some(Self {
                millis: millis.parse().ok()?,
                seq: seq.parse().ok()?,
            }),
            None => Some(Self {
                millis: id.parse().ok()?,
                seq: 0,
            }),
        }
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.millis, self.seq)
    }
}

struct Entry {
    id: EntryId,
    fields: HashMap<String, String>,
}

impl Entry {
    fn to_message(&self) -> RawMessage {
        RawMessage::new(self.id.to_string(), self.fields.clone())
    }
}

struct PendingEntry {
    consumer: String,
    delivery_count: u32,
}

#[derive(Default)]
struct GroupState {
    /// `None` until the first delivery of a group created at the origin.
    last_delivered: Option<EntryId>,
    pending: BTreeMap<EntryId, PendingEntry>,
    consumers: BTreeSet<String>,
}

#[derive(Default)]
struct StreamState {
    entries: Vec<Entry>,
    groups: BTreeMap<String, GroupState>,
}

impl StreamState {
    fn last_id(&self) -> Option<EntryId> {
        self.entries.last().map(|entry| entry.id)
    }

    fn next_id(&self, now_millis: u64) -> EntryId {
        match self.last_id() {
            Some(last) if now_millis <= last.millis => EntryId {
                millis: last.millis,
                seq: last.seq + 1,
            },
            _ => EntryId {
                millis: now_millis,
                seq: 0,
            },
        }
    }

    fn claim_undelivered(&mut self, request: &ClaimRequest) -> DomainResult<Vec<RawMessage>> {
        let StreamState { entries, groups } = self;
        let group = groups
            .get_mut(&request.group)
            .ok_or_else(|| missing_group(&request.stream, &request.group))?;
        group.consumers.insert(request.consumer.clone());

        let start = match group.last_delivered {
            None => 0,
            Some(last) => entries.partition_point(|entry| entry.id <= last),
        };

        let mut messages = Vec::new();
        for entry in entries[start..].iter().take(request.count) {
            group.pending.insert(
                entry.id,
                PendingEntry {
                    consumer: request.consumer.clone(),
                    delivery_count: 1,
                },
            );
            group.last_delivered = Some(entry.id);
            messages.push(entry.to_message());
        }

        Ok(messages)
    }

    fn claim_pending(&mut self, request: &ClaimRequest, after: &str) -> DomainResult<Vec<RawMessage>> {
        let after = EntryId::parse(after).ok_or_else(|| {
            DomainError::RepositoryError(anyhow::anyhow!("Invalid stream ID: {}", after))
        })?;

        let StreamState { entries, groups } = self;
        let group = groups
            .get_mut(&request.group)
            .ok_or_else(|| missing_group(&request.stream, &request.group))?;
        group.consumers.insert(request.consumer.clone());

        let mut messages = Vec::new();
        for (id, pending) in group
            .pending
            .range_mut((Bound::Excluded(after), Bound::Unbounded))
        {
            if messages.len() >= request.count {
                break;
            }
            if pending.consumer != request.consumer {
                continue;
            }

            pending.delivery_count += 1;
            let fields = entries
                .binary_search_by_key(id, |entry| entry.id)
                .map(|index| entries[index].fields.clone())
                .unwrap_or_default();
            messages.push(RawMessage::new(id.to_string(), fields));
        }

        Ok(messages)
    }
}

fn missing_group(stream: &str, group: &str) -> DomainError {
    DomainError::RepositoryError(anyhow::anyhow!(
        "NOGROUP no consumer group '{}' for stream '{}'",
        group,
        stream
    ))
}

/// In-memory implementation of [`ReadingLog`] with the same consumer-group
/// semantics as the Redis backend: per-group delivery cursor, per-consumer
/// pending sets, blocking claims woken by appends.
pub struct InMemoryReadingLog {
    streams: Mutex<HashMap<String, StreamState>>,
    appended: Notify,
}

impl InMemoryReadingLog {
    pub fn new() -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
            appended: Notify::new(),
        }
    }
}

impl Default for InMemoryReadingLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadingLog for InMemoryReadingLog {
    async fn ensure_group(&self, stream: &str, group: &str, start: GroupStart) -> DomainResult<()> {
        let mut streams = self.streams.lock().await;
        let state = streams.entry(stream.to_string()).or_default();

        if state.groups.contains_key(group) {
            return Err(DomainError::GroupAlreadyExists(group.to_string()));
        }

        let last_delivered = match start {
            GroupStart::Origin => None,
            GroupStart::Latest => state.last_id(),
        };
        state.groups.insert(
            group.to_string(),
            GroupState {
                last_delivered,
                ..Default::default()
            },
        );
        Ok(())
    }

    async fn claim(&self, request: &ClaimRequest) -> DomainResult<Vec<RawMessage>> {
        let deadline = match (&request.position, request.block) {
            (ClaimPosition::Undelivered, Some(block)) => Some(Instant::now() + block),
            _ => None,
        };

        loop {
            let notified = self.appended.notified();
            tokio::pin!(notified);

            {
                let mut streams = self.streams.lock().await;
                let state = streams
                    .get_mut(&request.stream)
                    .ok_or_else(|| missing_group(&request.stream, &request.group))?;

                let messages = match &request.position {
                    ClaimPosition::Undelivered => state.claim_undelivered(request)?,
                    ClaimPosition::PendingAfter(after) => state.claim_pending(request, after)?,
                };
                if !messages.is_empty() {
                    return Ok(messages);
                }

                // Registered before the lock is released so an append in
                // between still wakes us.
                notified.as_mut().enable();
            }

            let Some(deadline) = deadline else {
                return Ok(Vec::new());
            };
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }

    async fn acknowledge(&self, stream: &str, group: &str, message_id: &str) -> DomainResult<bool> {
        let mut streams = self.streams.lock().await;
        let Some(group) = streams
            .get_mut(stream)
            .and_then(|state| state.groups.get_mut(group))
        else {
            return Ok(false);
        };

        Ok(EntryId::parse(message_id)
            .map(|id| group.pending.remove(&id).is_some())
            .unwrap_or(false))
    }

    async fn append(&self, stream: &str, fields: Vec<(String, String)>) -> DomainResult<String> {
        let id = {
            let mut streams = self.streams.lock().await;
            let state = streams.entry(stream.to_string()).or_default();
            let id = state.next_id(Utc::now().timestamp_millis().max(0) as u64);
            state.entries.push(Entry {
                id,
                fields: fields.into_iter().collect(),
            });
            id
        };

        self.appended.notify_waiters();
        Ok(id.to_string())
    }

    async fn stream_stats(&self, stream: &str) -> DomainResult<StreamStats> {
        let streams = self.streams.lock().await;
        Ok(streams
            .get(stream)
            .map(|state| StreamStats {
                length: state.entries.len(),
                first_entry: state.entries.first().map(Entry::to_message),
                last_entry: state.entries.last().map(Entry::to_message),
            })
            .unwrap_or_default())
    }

    async fn group_stats(&self, stream: &str) -> DomainResult<Vec<GroupStats>> {
        let streams = self.streams.lock().await;
        Ok(streams
            .get(stream)
            .map(|state| {
                state
                    .groups
                    .iter()
                    .map(|(name, group)| GroupStats {
                        name: name.clone(),
                        consumers: group.consumers.len(),
                        pending: group.pending.len(),
                        last_delivered_id: group
                            .last_delivered
                            .map(|id| id.to_string())
                            .unwrap_or_else(|| "0-0".to_string()),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn ping(&self) -> DomainResult<()> {
        Ok(())
    }
}
