//! Spawns and looks up room actors by code or id. An `Arc<RwLock<HashMap<..>>>`
//! registry fronting a set of actor handles, with no backing persistence:
//! rooms are in-memory for the life of the process, archived on close
//! through [`crate::archival::ArchivalSink`] rather than reloaded from disk.
use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{RwLock, broadcast};
use tokio::task::AbortHandle;

use crate::archival::ArchivalSink;
use crate::bot::{self, BotSkill, BotTiming};
use crate::events::EventLogConfig;

use super::actor::{RoomActor, RoomHandle};
use super::entities::{RoomConfig, RoomId, RoomSummary, generate_room_code};
use super::phase::Phase;

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RoomManagerError {
    #[error("ROOM_NOT_FOUND")]
    RoomNotFound,
    #[error("ROOM_CODE_COLLISION")]
    RoomCodeCollision,
}

/// Registry of live rooms, keyed by both room code (what players type in)
/// and room id (what connections remember once joined).
pub struct RoomManager {
    rooms_by_code: RwLock<HashMap<String, RoomHandle>>,
    rooms_by_id: RwLock<HashMap<RoomId, RoomHandle>>,
    bot_drivers: RwLock<HashMap<RoomId, AbortHandle>>,
    room_config: RoomConfig,
    event_log_config: EventLogConfig,
    bot_timing: BotTiming,
    archival: Arc<dyn ArchivalSink>,
    /// Fires whenever the live room set changes, so a lobby-side connection
    /// can push itself a fresh `room_list_update` instead of polling `/rooms`.
    lobby_tx: broadcast::Sender<()>,
}

impl RoomManager {
    pub fn new(
        room_config: RoomConfig,
        event_log_config: EventLogConfig,
        archival: Arc<dyn ArchivalSink>,
    ) -> Self {
        Self::with_bot_timing(room_config, event_log_config, archival, BotTiming::default())
    }

    pub fn with_bot_timing(
        room_config: RoomConfig,
        event_log_config: EventLogConfig,
        archival: Arc<dyn ArchivalSink>,
        bot_timing: BotTiming,
    ) -> Self {
        let (lobby_tx, _rx) = broadcast::channel(16);
        Self {
            rooms_by_code: RwLock::new(HashMap::new()),
            rooms_by_id: RwLock::new(HashMap::new()),
            bot_drivers: RwLock::new(HashMap::new()),
            room_config,
            event_log_config,
            bot_timing,
            archival,
            lobby_tx,
        }
    }

    /// Subscribes to lobby-wide room-list change notifications. A receiver
    /// should re-fetch [`Self::list_rooms`] on every signal rather than
    /// trying to reconstruct the diff from the notification alone.
    pub fn subscribe_lobby(&self) -> broadcast::Receiver<()> {
        self.lobby_tx.subscribe()
    }

    /// Creates a fresh room with `host_name` seated at seat 0, retrying the
    /// room-code draw on collision against the live registry. Also spawns
    /// that room's bot driver, which lives for as long as the room does.
    pub async fn create_room(&self, host_name: String) -> RoomHandle {
        let code = loop {
            let candidate = {
                let mut rng = rand::rng();
                generate_room_code(&mut rng)
            };
            if !self.rooms_by_code.read().await.contains_key(&candidate) {
                break candidate;
            }
        };
        let handle = RoomActor::spawn(
            code.clone(),
            host_name,
            self.room_config,
            self.event_log_config,
            self.archival.clone(),
        );
        self.rooms_by_code.write().await.insert(code, handle.clone());
        self.rooms_by_id.write().await.insert(handle.room_id, handle.clone());
        let driver = bot::spawn_driver(handle.clone(), BotSkill::default(), self.bot_timing);
        self.bot_drivers.write().await.insert(handle.room_id, driver);
        let _ = self.lobby_tx.send(());
        handle
    }

    pub async fn find_by_code(&self, room_code: &str) -> Result<RoomHandle, RoomManagerError> {
        self.rooms_by_code
            .read()
            .await
            .get(room_code)
            .cloned()
            .ok_or(RoomManagerError::RoomNotFound)
    }

    pub async fn find_by_id(&self, room_id: RoomId) -> Result<RoomHandle, RoomManagerError> {
        self.rooms_by_id
            .read()
            .await
            .get(&room_id)
            .cloned()
            .ok_or(RoomManagerError::RoomNotFound)
    }

    /// Lists every live room's lobby summary, used for `room_list_update`.
    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        let handles: Vec<RoomHandle> = self.rooms_by_id.read().await.values().cloned().collect();
        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Some(summary) = handle.summary().await {
                summaries.push(summary);
            }
        }
        summaries
    }

    /// Closes and evicts a room, e.g. once every seat is vacant or the game
    /// has ended and every player has left.
    pub async fn close_room(&self, room_id: RoomId) {
        if let Some(handle) = self.rooms_by_id.write().await.remove(&room_id) {
            self.rooms_by_code.write().await.remove(&handle.room_code);
            if let Some(driver) = self.bot_drivers.write().await.remove(&room_id) {
                driver.abort();
            }
            let (tx, rx) = tokio::sync::oneshot::channel();
            let _ = handle.send(super::messages::RoomMessage::Close { response: tx }).await;
            let _ = rx.await;
            let _ = self.lobby_tx.send(());
        }
    }

    /// Evicts every room whose lobby is empty, or whose game has concluded,
    /// called periodically by the gateway's housekeeping task. A finished
    /// game never vacates its seats (disconnected players stay seated under
    /// bot control), so `GameOver` is its own closing signal independent of
    /// `occupied`.
    pub async fn reap_empty_rooms(&self) {
        let handles: Vec<RoomHandle> = self.rooms_by_id.read().await.values().cloned().collect();
        for handle in handles {
            if let Some(summary) = handle.summary().await
                && (summary.occupied == 0 || summary.phase == Phase::GameOver)
            {
                self.close_room(handle.room_id).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archival::NoopArchivalSink;

    fn manager() -> RoomManager {
        RoomManager::new(RoomConfig::default(), EventLogConfig::default(), Arc::new(NoopArchivalSink))
    }

    #[tokio::test]
    async fn create_then_find_by_code_round_trips() {
        let manager = manager();
        let handle = manager.create_room("Alice".into()).await;
        let found = manager.find_by_code(&handle.room_code).await.unwrap();
        assert_eq!(found.room_id, handle.room_id);
    }

    #[tokio::test]
    async fn find_unknown_code_errors() {
        let manager = manager();
        assert_eq!(manager.find_by_code("ZZZZZZ").await.unwrap_err(), RoomManagerError::RoomNotFound);
    }

    #[tokio::test]
    async fn lobby_signal_fires_on_create_and_close() {
        let manager = manager();
        let mut lobby_rx = manager.subscribe_lobby();
        let handle = manager.create_room("Alice".into()).await;
        lobby_rx.recv().await.expect("create_room signals the lobby");
        manager.close_room(handle.room_id).await;
        lobby_rx.recv().await.expect("close_room signals the lobby");
    }

    #[tokio::test]
    async fn reap_empty_rooms_evicts_a_room_with_no_seats() {
        let manager = manager();
        let handle = manager.create_room("Alice".into()).await;
        handle.remove_player(0, 0).await.unwrap();
        manager.reap_empty_rooms().await;
        assert_eq!(manager.find_by_id(handle.room_id).await.unwrap_err(), RoomManagerError::RoomNotFound);
    }
}
