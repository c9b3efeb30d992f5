//! Test doubles and JSON fixtures shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dota_client::{FetchError, RawResponse, Transport};
use serde_json::json;
use tokio::sync::Notify;

use crate::ops::lock;
use crate::persist::{PersistError, Persistence};

/// Transport answering from per-path scripts.
///
/// The last scripted response for a path is replayed once the queue is
/// down to one entry. A gate makes the next call to a path wait until
/// the gate is notified.
#[derive(Default)]
pub(crate) struct FakeTransport {
    routes: Mutex<HashMap<String, VecDeque<Result<RawResponse, FetchError>>>>,
    gates: Mutex<HashMap<String, VecDeque<Arc<Notify>>>>,
    calls: Mutex<Vec<(String, bool)>>,
}

impl FakeTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn ok(&self, path: &str, body: impl Into<String>) {
        self.push(path, Ok(response(200, "OK", body.into())));
    }

    pub(crate) fn status(&self, path: &str, status: u16, body: impl Into<String>) {
        self.push(path, Ok(response(status, "Internal Server Error", body.into())));
    }

    pub(crate) fn network_error(&self, path: &str) {
        self.push(path, Err(FetchError::Network("connection refused".into())));
    }

    fn push(&self, path: &str, result: Result<RawResponse, FetchError>) {
        lock(&self.routes)
            .entry(path.to_string())
            .or_default()
            .push_back(result);
    }

    /// Hold the next call to `path` until the returned gate is notified.
    pub(crate) fn gate(&self, path: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        lock(&self.gates)
            .entry(path.to_string())
            .or_default()
            .push_back(gate.clone());
        gate
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        lock(&self.calls).iter().filter(|(p, _)| p == path).count()
    }

    pub(crate) fn forced_calls_to(&self, path: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|(p, force)| p == path && *force)
            .count()
    }
}

fn response(status: u16, status_text: &str, body: String) -> RawResponse {
    RawResponse {
        status,
        status_text: status_text.to_string(),
        body,
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, path: &str, force: bool) -> Result<RawResponse, FetchError> {
        lock(&self.calls).push((path.to_string(), force));

        let gate = lock(&self.gates).get_mut(path).and_then(|q| q.pop_front());
        let result = {
            let mut routes = lock(&self.routes);
            match routes.get_mut(path) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        if let Some(gate) = gate {
            gate.notified().await;
        }
        result.unwrap_or_else(|| Err(FetchError::Network(format!("no route for {path}"))))
    }
}

pub(crate) fn team_json(team_id: u64, name: &str, match_ids: &[u64]) -> String {
    let matches: Vec<_> = match_ids.iter().map(|id| json!({ "matchId": id })).collect();
    json!({
        "id": team_id,
        "name": name,
        "tag": "TS",
        "matches": matches,
    })
    .to_string()
}

pub(crate) fn league_json(league_id: u64, name: &str) -> String {
    json!({ "id": league_id, "name": name, "tier": "premium" }).to_string()
}

/// Match between `radiant` and `dire`. Radiant wins and picks first.
pub(crate) fn match_json(
    match_id: u64,
    radiant: u64,
    dire: u64,
    radiant_accounts: &[u64],
    dire_accounts: &[u64],
) -> String {
    let players: Vec<_> = radiant_accounts
        .iter()
        .enumerate()
        .map(|(slot, id)| json!({ "account_id": id, "player_slot": slot, "hero_id": 1 }))
        .chain(
            dire_accounts
                .iter()
                .enumerate()
                .map(|(slot, id)| json!({ "account_id": id, "player_slot": 128 + slot, "hero_id": 2 })),
        )
        .collect();
    json!({
        "match_id": match_id,
        "radiant_team_id": radiant,
        "dire_team_id": dire,
        "radiant_name": format!("Team {radiant}"),
        "dire_name": format!("Team {dire}"),
        "radiant_win": true,
        "start_time": 1_700_000_000,
        "duration": 2100,
        "leagueid": 5,
        "players": players,
        "picks_bans": [{ "is_pick": true, "hero_id": 1, "team": 0, "order": 0 }],
    })
    .to_string()
}

pub(crate) fn player_json(account_id: u64) -> String {
    json!({
        "profile": { "accountId": account_id, "personaname": format!("player{account_id}") },
        "overallStats": { "wins": 10, "losses": 5 },
    })
    .to_string()
}

pub(crate) fn heroes_json() -> String {
    json!([
        { "id": 1, "name": "npc_dota_hero_antimage", "localized_name": "Anti-Mage", "roles": ["Carry"] },
        { "id": 2, "name": "npc_dota_hero_axe", "localized_name": "Axe", "roles": ["Initiator"] },
    ])
    .to_string()
}

/// In-memory persistence that can be inspected.
#[derive(Default)]
pub(crate) struct MemoryPersistence {
    collections: Mutex<HashMap<String, String>>,
}

impl MemoryPersistence {
    pub(crate) fn body(&self, collection: &str) -> Option<String> {
        lock(&self.collections).get(collection).cloned()
    }
}

impl Persistence for MemoryPersistence {
    fn save(&self, collection: &str, body: &str) -> Result<(), PersistError> {
        lock(&self.collections).insert(collection.to_string(), body.to_string());
        Ok(())
    }

    fn load(&self, collection: &str) -> Result<Option<String>, PersistError> {
        Ok(self.body(collection))
    }
}

/// Persistence whose every call fails.
pub(crate) struct FailingPersistence;

impl Persistence for FailingPersistence {
    fn save(&self, _collection: &str, _body: &str) -> Result<(), PersistError> {
        Err(PersistError::Backend("disk full".into()))
    }

    fn load(&self, _collection: &str) -> Result<Option<String>, PersistError> {
        Err(PersistError::Backend("disk unreadable".into()))
    }
}

/// Formatted log output captured for the current thread.
#[derive(Clone, Default)]
pub(crate) struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route this thread's events here until the guard is dropped.
    pub(crate) fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&lock(&self.0)).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock(&self.0).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
