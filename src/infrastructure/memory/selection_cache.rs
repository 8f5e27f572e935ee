//! In-Memory Selection Cache Implementation

use chrono::Utc;
use dashmap::DashMap;
use std::time::Duration;

use crate::application::ports::{PendingSelection, SelectionCachePort};
use crate::domain::playback::{GuildId, MessageId, Track, UserId};

/// 内存搜索候选缓存
///
/// 条目超过 TTL 即视为不存在：访问时惰性淘汰，`sweep_expired` 批量清理。
pub struct InMemorySelectionCache {
    entries: DashMap<(GuildId, UserId), PendingSelection>,
    ttl: chrono::Duration,
    max_candidates: usize,
}

impl InMemorySelectionCache {
    pub fn new(ttl: Duration, max_candidates: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365)),
            max_candidates,
        }
    }

    fn is_expired(&self, entry: &PendingSelection) -> bool {
        Utc::now() - entry.created_at > self.ttl
    }

    /// 过期条目在访问时直接删除
    fn evict_if_expired(&self, key: &(GuildId, UserId)) {
        if self.entries.remove_if(key, |_, entry| self.is_expired(entry)).is_some() {
            tracing::debug!(guild_id = %key.0, requester_id = %key.1, "Pending selection expired");
        }
    }
}

impl SelectionCachePort for InMemorySelectionCache {
    fn record(
        &self,
        guild_id: GuildId,
        requester_id: UserId,
        mut candidates: Vec<Track>,
        prompt_message_id: MessageId,
    ) {
        candidates.truncate(self.max_candidates);
        let count = candidates.len();
        let replaced = self
            .entries
            .insert(
                (guild_id, requester_id),
                PendingSelection::new(candidates, prompt_message_id),
            )
            .is_some();

        tracing::debug!(
            guild_id = %guild_id,
            requester_id = %requester_id,
            candidates = count,
            replaced = replaced,
            "Pending selection recorded"
        );
    }

    fn resolve(&self, guild_id: GuildId, requester_id: UserId, index: usize) -> Option<Track> {
        let key = (guild_id, requester_id);
        self.evict_if_expired(&key);

        let (_, entry) = self
            .entries
            .remove_if(&key, |_, entry| entry.contains_index(index))?;

        tracing::debug!(
            guild_id = %guild_id,
            requester_id = %requester_id,
            index = index,
            "Pending selection resolved"
        );
        entry.candidates.into_iter().nth(index - 1)
    }

    fn pending(&self, guild_id: GuildId, requester_id: UserId) -> Option<PendingSelection> {
        let key = (guild_id, requester_id);
        self.evict_if_expired(&key);
        self.entries.get(&key).map(|entry| entry.value().clone())
    }

    fn sweep_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !self.is_expired(entry));
        let swept = before.saturating_sub(self.entries.len());
        if swept > 0 {
            tracing::info!(swept = swept, "Expired pending selections swept");
        }
        swept
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUILD: GuildId = GuildId::new(1);
    const USER: UserId = UserId::new(2);

    fn tracks(n: usize) -> Vec<Track> {
        (1..=n).map(|i| Track::new(format!("T{}", i), format!("enc{}", i))).collect()
    }

    fn cache() -> InMemorySelectionCache {
        InMemorySelectionCache::new(Duration::from_secs(300), 10)
    }

    #[test]
    fn test_resolve_is_single_use() {
        let cache = cache();
        cache.record(GUILD, USER, tracks(4), MessageId::new(9));

        assert_eq!(cache.resolve(GUILD, USER, 3).unwrap().title, "T3");
        assert!(cache.resolve(GUILD, USER, 3).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_out_of_range_keeps_entry() {
        let cache = cache();
        cache.record(GUILD, USER, tracks(4), MessageId::new(9));

        assert!(cache.resolve(GUILD, USER, 0).is_none());
        assert!(cache.resolve(GUILD, USER, 5).is_none());
        assert_eq!(cache.pending(GUILD, USER).unwrap().candidates.len(), 4);
        assert_eq!(cache.resolve(GUILD, USER, 4).unwrap().title, "T4");
    }

    #[test]
    fn test_entries_are_keyed_per_requester() {
        let cache = cache();
        cache.record(GUILD, USER, tracks(2), MessageId::new(9));

        assert!(cache.resolve(GUILD, UserId::new(3), 1).is_none());
        assert!(cache.resolve(GuildId::new(5), USER, 1).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_record_overwrites_and_truncates() {
        let cache = cache();
        cache.record(GUILD, USER, tracks(3), MessageId::new(1));
        cache.record(GUILD, USER, tracks(15), MessageId::new(2));

        let pending = cache.pending(GUILD, USER).unwrap();
        assert_eq!(pending.candidates.len(), 10);
        assert_eq!(pending.prompt_message_id, MessageId::new(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entries_are_gone() {
        let cache = InMemorySelectionCache::new(Duration::from_millis(20), 10);
        cache.record(GUILD, USER, tracks(2), MessageId::new(1));
        cache.record(GUILD, UserId::new(3), tracks(2), MessageId::new(1));
        std::thread::sleep(Duration::from_millis(40));

        assert!(cache.resolve(GUILD, USER, 1).is_none());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.len(), 0);
    }
}
