use crate::domain::{
    ClaimPosition, ClaimRequest, DomainResult, GroupStart, GroupStats, RawMessage, ReadingLog,
    StreamStats,
};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::streams::{
    StreamId, StreamInfoGroupsReply, StreamRangeReply, StreamReadOptions, StreamReadReply,
};
use redis::AsyncCommands;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Redis Streams implementation of [`ReadingLog`].
///
/// Claims use `XREADGROUP` on their own connection because `BLOCK` holds the
/// connection for the whole wait.
#[derive(Clone)]
pub struct RedisReadingLog {
    commands: ConnectionManager,
    blocking: ConnectionManager,
}

impl RedisReadingLog {
    pub fn new(commands: ConnectionManager, blocking: ConnectionManager) -> Self {
        Self { commands, blocking }
    }
}

fn stream_id_to_message(entry: StreamId) -> RawMessage {
    let fields: HashMap<String, String> = entry
        .map
        .iter()
        .filter_map(|(name, value)| {
            redis::from_redis_value::<String>(value)
                .ok()
                .map(|value| (name.clone(), value))
        })
        .collect();

    RawMessage::new(entry.id, fields)
}

#[async_trait]
impl ReadingLog for RedisReadingLog {
    #[instrument(skip(self))]
    async fn ensure_group(&self, stream: &str, group: &str, start: GroupStart) -> DomainResult<()> {
        let start_id = match start {
            GroupStart::Origin => "0",
            GroupStart::Latest => "$",
        };

        let mut conn = self.commands.clone();
        let _: () = conn.xgroup_create_mkstream(stream, group, start_id).await?;
        Ok(())
    }

    async fn claim(&self, request: &ClaimRequest) -> DomainResult<Vec<RawMessage>> {
        let mut options = StreamReadOptions::default()
            .group(&request.group, &request.consumer)
            .count(request.count);

        let id = match &request.position {
            ClaimPosition::Undelivered => {
                if let Some(block) = request.block {
                    options = options.block(block.as_millis() as usize);
                }
                ">".to_string()
            }
            ClaimPosition::PendingAfter(after) => after.clone(),
        };

        let mut conn = self.blocking.clone();
        let reply: Option<StreamReadReply> = conn
            .xread_options(&[request.stream.as_str()], &[id.as_str()], &options)
            .await?;

        let messages: Vec<RawMessage> = reply
            .map(|reply| {
                reply
                    .keys
                    .into_iter()
                    .flat_map(|key| key.ids)
                    .map(stream_id_to_message)
                    .collect()
            })
            .unwrap_or_default();

        debug!(
            stream = %request.stream,
            consumer = %request.consumer,
            count = messages.len(),
            "claimed messages"
        );
        Ok(messages)
    }

    async fn acknowledge(&self, stream: &str, group: &str, message_id: &str) -> DomainResult<bool> {
        let mut conn = self.commands.clone();
        let acknowledged: i64 = conn.xack(stream, group, &[message_id]).await?;
        Ok(acknowledged > 0)
    }

    #[instrument(skip(self, fields), fields(field_count = fields.len()))]
    async fn append(&self, stream: &str, fields: Vec<(String, String)>) -> DomainResult<String> {
        let mut conn = self.commands.clone();
        let message_id: String = conn.xadd(stream, "*", fields.as_slice()).await?;
        Ok(message_id)
    }

    async fn stream_stats(&self, stream: &str) -> DomainResult<StreamStats> {
        let mut conn = self.commands.clone();

        let length: usize = conn.xlen(stream).await?;
        let first: StreamRangeReply = conn.xrange_count(stream, "-", "+", 1).await?;
        let last: StreamRangeReply = conn.xrevrange_count(stream, "+", "-", 1).await?;

        Ok(StreamStats {
            length,
            first_entry: first.ids.into_iter().next().map(stream_id_to_message),
            last_entry: last.ids.into_iter().next().map(stream_id_to_message),
        })
    }

    async fn group_stats(&self, stream: &str) -> DomainResult<Vec<GroupStats>> {
        let mut conn = self.commands.clone();

        let exists: bool = conn.exists(stream).await?;
        if !exists {
            return Ok(Vec::new());
        }

        let reply: StreamInfoGroupsReply = conn.xinfo_groups(stream).await?;
        Ok(reply
            .groups
            .into_iter()
            .map(|group| GroupStats {
                name: group.name,
                consumers: group.consumers,
                pending: group.pending,
                last_delivered_id: group.last_delivered_id,
            })
            .collect())
    }

    async fn ping(&self) -> DomainResult<()> {
        let mut conn = self.commands.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
