//! Session store: the vault of completed sessions plus constellation nodes.
//!
//! `SessionStore` is the seam the completion workflow talks to. `MemoryStore`
//! keeps everything in memory and, when given a path, rewrites a JSON snapshot
//! after every mutation so the vault survives restarts.

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::domain::{ConstellationNode, LearningSession};
use crate::error::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Computes a new node from the current constellation.
pub type NodeBuilder = Box<dyn FnOnce(&[ConstellationNode]) -> ConstellationNode + Send>;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert or replace a session (matched by id).
    async fn save_session(&self, session: LearningSession) -> StoreResult<()>;

    /// All sessions in insertion order.
    async fn list_sessions(&self) -> StoreResult<Vec<LearningSession>>;

    async fn find_session(&self, id: &str) -> StoreResult<Option<LearningSession>>;

    /// Case-insensitive match on topic, category, vault content and explanation.
    /// A blank query returns everything.
    async fn search_sessions(&self, query: &str) -> StoreResult<Vec<LearningSession>>;

    /// Insert or replace a constellation node (matched by id).
    async fn upsert_node(&self, node: ConstellationNode) -> StoreResult<()>;

    /// Save a session together with its constellation node in one write. The
    /// node is built from the nodes already placed, with no other writer in
    /// between. Returns the inserted node.
    async fn archive_session(&self, session: LearningSession, build: NodeBuilder) -> StoreResult<ConstellationNode>;

    async fn list_nodes(&self) -> StoreResult<Vec<ConstellationNode>>;

    /// Drop every session and node.
    async fn clear(&self) -> StoreResult<()>;
}

pub fn session_matches(session: &LearningSession, query: &str) -> bool {
    let q = query.to_lowercase();
    session.topic.to_lowercase().contains(&q)
        || session.category.as_str().to_lowercase().contains(&q)
        || session.vault_content.to_lowercase().contains(&q)
        || session.ai_explanation.to_lowercase().contains(&q)
}

/// On-disk layout of the vault snapshot.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    sessions: Vec<LearningSession>,
    #[serde(default)]
    constellation: Vec<ConstellationNode>,
}

#[derive(Clone, Default)]
struct Inner {
    sessions: Vec<LearningSession>,
    session_index: HashMap<String, usize>,
    nodes: Vec<ConstellationNode>,
    node_index: HashMap<String, usize>,
}

impl Inner {
    fn from_snapshot(s: Snapshot) -> Self {
        let mut inner = Inner::default();
        for session in s.sessions {
            inner.put_session(session);
        }
        for node in s.constellation {
            inner.put_node(node);
        }
        inner
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot { sessions: self.sessions.clone(), constellation: self.nodes.clone() }
    }

    fn put_session(&mut self, session: LearningSession) {
        match self.session_index.get(&session.id) {
            Some(&i) => self.sessions[i] = session,
            None => {
                self.session_index.insert(session.id.clone(), self.sessions.len());
                self.sessions.push(session);
            }
        }
    }

    fn put_node(&mut self, node: ConstellationNode) {
        match self.node_index.get(&node.id) {
            Some(&i) => self.nodes[i] = node,
            None => {
                self.node_index.insert(node.id.clone(), self.nodes.len());
                self.nodes.push(node);
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
    persist_path: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an existing snapshot from `path` (if the file exists) and persist
    /// every later mutation back to it.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn with_snapshot(path: PathBuf) -> StoreResult<Self> {
        let inner = match tokio::fs::read_to_string(&path).await {
            Ok(s) => {
                let snap: Snapshot = serde_json::from_str(&s)?;
                info!(target: "knowledge_quest_backend", sessions = snap.sessions.len(), nodes = snap.constellation.len(), "Loaded vault snapshot");
                Inner::from_snapshot(snap)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(target: "knowledge_quest_backend", "No vault snapshot yet; starting empty");
                Inner::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { inner: Arc::new(RwLock::new(inner)), persist_path: Some(path) })
    }

    /// Apply `change` and persist the result. With a snapshot path the change
    /// is made on a copy and only committed once the write succeeded.
    async fn mutate<R>(&self, change: impl FnOnce(&mut Inner) -> R) -> StoreResult<R> {
        let mut inner = self.inner.write().await;
        if self.persist_path.is_none() {
            return Ok(change(&mut *inner));
        }
        let mut next = inner.clone();
        let out = change(&mut next);
        self.persist(&next).await?;
        *inner = next;
        Ok(out)
    }

    async fn persist(&self, inner: &Inner) -> StoreResult<()> {
        let Some(path) = &self.persist_path else { return Ok(()) };
        let json = serde_json::to_string_pretty(&inner.snapshot())?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        // Rename over the old snapshot; readers never see a partial file.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!(target: "knowledge_quest_backend", path = %path.display(), "Vault snapshot written");
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    #[instrument(level = "debug", skip(self, session), fields(id = %session.id))]
    async fn save_session(&self, session: LearningSession) -> StoreResult<()> {
        self.mutate(|inner| inner.put_session(session)).await
    }

    async fn list_sessions(&self) -> StoreResult<Vec<LearningSession>> {
        Ok(self.inner.read().await.sessions.clone())
    }

    async fn find_session(&self, id: &str) -> StoreResult<Option<LearningSession>> {
        let inner = self.inner.read().await;
        Ok(inner.session_index.get(id).map(|&i| inner.sessions[i].clone()))
    }

    #[instrument(level = "debug", skip(self), fields(query_len = query.len()))]
    async fn search_sessions(&self, query: &str) -> StoreResult<Vec<LearningSession>> {
        let inner = self.inner.read().await;
        let q = query.trim();
        if q.is_empty() {
            return Ok(inner.sessions.clone());
        }
        Ok(inner.sessions.iter().filter(|s| session_matches(s, q)).cloned().collect())
    }

    #[instrument(level = "debug", skip(self, node), fields(id = %node.id))]
    async fn upsert_node(&self, node: ConstellationNode) -> StoreResult<()> {
        self.mutate(|inner| inner.put_node(node)).await
    }

    #[instrument(level = "debug", skip_all, fields(id = %session.id))]
    async fn archive_session(&self, session: LearningSession, build: NodeBuilder) -> StoreResult<ConstellationNode> {
        self.mutate(|inner| {
            inner.put_session(session);
            let node = build(&inner.nodes);
            inner.put_node(node.clone());
            node
        })
        .await
    }

    async fn list_nodes(&self) -> StoreResult<Vec<ConstellationNode>> {
        Ok(self.inner.read().await.nodes.clone())
    }

    #[instrument(level = "info", skip(self))]
    async fn clear(&self) -> StoreResult<()> {
        self.mutate(|inner| *inner = Inner::default()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ArticulationResult, Category, Difficulty, GauntletResult, LightningResult, Rarity, TrialRecord,
    };
    use chrono::NaiveDate;

    fn session(id: &str, topic: &str, category: Category, vault: &str) -> LearningSession {
        let difficulty = Difficulty::try_from(2u8).expect("difficulty");
        LearningSession {
            id: id.into(),
            topic: topic.into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).expect("date"),
            difficulty,
            difficulty_name: difficulty.name().into(),
            category,
            trials: TrialRecord {
                articulation: ArticulationResult { score: 6.0, text: String::new(), feedback: String::new() },
                gauntlet: GauntletResult::from_answers(vec![true, false], vec![]),
                lightning: LightningResult::from_answers(vec![true], vec![], 0),
            },
            rarity: Rarity::Rare,
            final_score: 7.1,
            chat_history: vec![],
            vault_content: vault.into(),
            ai_explanation: String::new(),
        }
    }

    fn node(id: &str) -> ConstellationNode {
        ConstellationNode {
            id: id.into(),
            topic: id.into(),
            category: Category::Arts,
            difficulty: Difficulty::try_from(1u8).expect("difficulty"),
            rarity: Rarity::Normal,
            x: 1.0,
            y: 2.0,
            connections: vec![],
        }
    }

    #[tokio::test]
    async fn save_upserts_by_id_and_keeps_order() {
        let store = MemoryStore::new();
        store.save_session(session("1", "Rust", Category::Technology, "")).await.expect("save");
        store.save_session(session("2", "Jazz", Category::Arts, "")).await.expect("save");
        store.save_session(session("1", "Rust ownership", Category::Technology, "notes")).await.expect("save");

        let all = store.list_sessions().await.expect("list");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].topic, "Rust ownership");
        assert_eq!(all[1].id, "2");

        let found = store.find_session("2").await.expect("find");
        assert_eq!(found.map(|s| s.topic), Some("Jazz".to_string()));
        assert!(store.find_session("missing").await.expect("find").is_none());
    }

    #[tokio::test]
    async fn search_covers_topic_category_and_content() {
        let store = MemoryStore::new();
        store.save_session(session("1", "Photosynthesis", Category::Sciences, "chlorophyll")).await.expect("save");
        store.save_session(session("2", "Haiku", Category::Arts, "seasonal words")).await.expect("save");

        assert_eq!(store.search_sessions("PHOTO").await.expect("search").len(), 1);
        assert_eq!(store.search_sessions("arts").await.expect("search")[0].id, "2");
        assert_eq!(store.search_sessions("chloro").await.expect("search")[0].id, "1");
        assert_eq!(store.search_sessions("   ").await.expect("search").len(), 2);
        assert!(store.search_sessions("quantum").await.expect("search").is_empty());
    }

    #[tokio::test]
    async fn nodes_upsert_and_clear() {
        let store = MemoryStore::new();
        store.upsert_node(node("a")).await.expect("node");
        let mut moved = node("a");
        moved.x = 99.0;
        store.upsert_node(moved).await.expect("node");
        store.upsert_node(node("b")).await.expect("node");

        let nodes = store.list_nodes().await.expect("nodes");
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].x, 99.0);

        store.save_session(session("1", "x", Category::Skills, "")).await.expect("save");
        store.clear().await.expect("clear");
        assert!(store.list_nodes().await.expect("nodes").is_empty());
        assert!(store.list_sessions().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn snapshot_round_trips_through_disk() {
        let path = std::env::temp_dir().join(format!("kq-vault-{}.json", uuid::Uuid::new_v4()));

        let store = MemoryStore::with_snapshot(path.clone()).await.expect("open");
        store.save_session(session("1", "Stoicism", Category::Humanities, "virtue")).await.expect("save");
        store.upsert_node(node("1")).await.expect("node");
        drop(store);

        let reopened = MemoryStore::with_snapshot(path.clone()).await.expect("reopen");
        assert_eq!(reopened.list_sessions().await.expect("list")[0].topic, "Stoicism");
        assert_eq!(reopened.list_nodes().await.expect("nodes").len(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn failed_write_leaves_memory_untouched() {
        let dir = std::env::temp_dir().join(format!("kq-vault-dir-{}", uuid::Uuid::new_v4()));
        let store = MemoryStore::with_snapshot(dir.join("vault.json")).await.expect("open");
        store.save_session(session("1", "Rust", Category::Technology, "")).await.expect("save");

        // A plain file where the directory was makes every later write fail.
        std::fs::remove_dir_all(&dir).expect("remove dir");
        std::fs::write(&dir, "blocker").expect("write blocker");

        assert!(matches!(
            store.save_session(session("2", "Jazz", Category::Arts, "")).await,
            Err(StoreError::Io(_))
        ));
        assert!(store.upsert_node(node("2")).await.is_err());
        let archived = store
            .archive_session(session("3", "Haiku", Category::Arts, ""), Box::new(|_: &[ConstellationNode]| node("3")))
            .await;
        assert!(archived.is_err());
        assert!(store.clear().await.is_err());

        let sessions = store.list_sessions().await.expect("list");
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, "1");
        assert!(store.list_nodes().await.expect("nodes").is_empty());

        let _ = std::fs::remove_file(&dir);
    }

    #[tokio::test]
    async fn concurrent_archives_see_each_other() {
        let store = Arc::new(MemoryStore::new());
        let place = |id: &'static str| {
            let store = store.clone();
            async move {
                store
                    .archive_session(session(id, id, Category::Arts, ""), Box::new(move |existing: &[ConstellationNode]| {
                        let mut n = node(id);
                        n.x = existing.len() as f64;
                        n
                    }))
                    .await
                    .expect("place")
            }
        };
        let (a, b) = tokio::join!(tokio::spawn(place("a")), tokio::spawn(place("b")));
        let (a, b) = (a.expect("join"), b.expect("join"));

        let mut slots = vec![a.x, b.x];
        slots.sort_by(f64::total_cmp);
        assert_eq!(slots, vec![0.0, 1.0]);
        assert_eq!(store.list_nodes().await.expect("nodes").len(), 2);
        assert_eq!(store.list_sessions().await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_reported() {
        let path = std::env::temp_dir().join(format!("kq-vault-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, "not json").expect("write");
        assert!(matches!(MemoryStore::with_snapshot(path.clone()).await, Err(StoreError::Serde(_))));
        let _ = std::fs::remove_file(&path);
    }
}
