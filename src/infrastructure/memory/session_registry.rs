//! In-Memory Session Registry Implementation

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::ports::{GuildLane, GuildSlot, SessionRegistryPort};
use crate::domain::playback::{GuildId, Session};

/// 内存会话注册表
///
/// 每个 guild 一把异步互斥锁，DashMap 的分片锁只在取出 Arc 时短暂持有，
/// 从不跨 await 持有。
pub struct InMemorySessionRegistry {
    slots: DashMap<GuildId, Arc<Mutex<GuildSlot>>>,
}

impl InMemorySessionRegistry {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    fn slot(&self, guild_id: GuildId) -> Arc<Mutex<GuildSlot>> {
        self.slots
            .entry(guild_id)
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .value()
            .clone()
    }

    /// 是否有活跃会话（不等待持有者）
    pub fn contains(&self, guild_id: GuildId) -> bool {
        self.slots
            .get(&guild_id)
            .and_then(|slot| slot.try_lock().ok().map(|s| s.is_some()))
            .unwrap_or(false)
    }

    /// 槽位数量（含空闲槽位）
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for InMemorySessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionRegistryPort for InMemorySessionRegistry {
    async fn lane(&self, guild_id: GuildId) -> GuildLane {
        let slot = self.slot(guild_id);
        GuildLane::new(guild_id, slot.lock_owned().await)
    }

    async fn snapshot(&self, guild_id: GuildId) -> Option<Session> {
        let slot = self.slots.get(&guild_id).map(|s| s.value().clone())?;
        let guard = slot.lock().await;
        guard.clone()
    }

    async fn active_guilds(&self) -> Vec<GuildId> {
        let slots: Vec<(GuildId, Arc<Mutex<GuildSlot>>)> = self
            .slots
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut active = Vec::new();
        for (guild_id, slot) in slots {
            if slot.lock().await.is_some() {
                active.push(guild_id);
            }
        }
        active.sort();
        active
    }

    fn prune_idle(&self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| {
            // 有其他持有者（或正在排队）的槽位保留
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(guard) => guard.is_some(),
                Err(_) => true,
            }
        });
        let pruned = before.saturating_sub(self.slots.len());
        if pruned > 0 {
            tracing::debug!(pruned = pruned, "Pruned idle guild slots");
        }
        pruned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::playback::{ChannelId, SessionState};
    use std::time::Duration;

    const VOICE: ChannelId = ChannelId::new(10);
    const TEXT: ChannelId = ChannelId::new(20);

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let registry = InMemorySessionRegistry::new();
        let guild = GuildId::new(1);

        {
            let mut lane = registry.lane(guild).await;
            let (session, created) = lane.get_or_create(VOICE, TEXT);
            assert!(created);
            assert_eq!(session.state(), SessionState::Connecting);
        }
        {
            let mut lane = registry.lane(guild).await;
            let (_, created) = lane.get_or_create(ChannelId::new(99), TEXT);
            assert!(!created);
            assert_eq!(lane.session().unwrap().voice_channel_id(), VOICE);
        }

        assert!(registry.contains(guild));
        assert_eq!(registry.active_guilds().await, vec![guild]);
    }

    #[tokio::test]
    async fn test_destroy_removes_session() {
        let registry = InMemorySessionRegistry::new();
        let guild = GuildId::new(1);

        let mut lane = registry.lane(guild).await;
        lane.get_or_create(VOICE, TEXT);
        let destroyed = lane.destroy("test").unwrap();
        assert_eq!(destroyed.state(), SessionState::Destroyed);
        assert!(lane.destroy("again").is_none());
        drop(lane);

        assert!(registry.snapshot(guild).await.is_none());
        assert!(!registry.contains(guild));
    }

    #[tokio::test]
    async fn test_concurrent_lanes_create_once() {
        let registry = Arc::new(InMemorySessionRegistry::new());
        let guild = GuildId::new(7);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    let mut lane = registry.lane(guild).await;
                    let (_, created) = lane.get_or_create(VOICE, TEXT);
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    created
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_lanes_of_different_guilds_are_independent() {
        let registry = InMemorySessionRegistry::new();
        let _held = registry.lane(GuildId::new(1)).await;

        let other = tokio::time::timeout(Duration::from_millis(100), registry.lane(GuildId::new(2))).await;
        assert!(other.is_ok());
    }

    #[tokio::test]
    async fn test_prune_idle_keeps_live_and_held_slots() {
        let registry = InMemorySessionRegistry::new();
        {
            let mut lane = registry.lane(GuildId::new(1)).await;
            lane.get_or_create(VOICE, TEXT);
        }
        drop(registry.lane(GuildId::new(2)).await);
        let held = registry.lane(GuildId::new(3)).await;

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.prune_idle(), 1);
        assert_eq!(registry.len(), 2);
        drop(held);
        assert_eq!(registry.prune_idle(), 1);
        assert!(registry.contains(GuildId::new(1)));
    }
}
