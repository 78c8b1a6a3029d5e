use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use crate::error::StoreError;
use crate::types::{
    Component, ComponentRecord, ComponentStats, DependencyEdgeRecord, EdgeView, StoreStats,
    SyncRun,
};

use super::schema;
use super::traits::{GraphStore, SEARCH_LIMIT};

const LAST_SYNC_KEY: &str = "last_sync";

const COMPONENT_COLUMNS: &str = "id, name, type, size, coverage";

// Node-row values win over the harvest-time copies; stats only exist on node rows.
const EDGE_VIEW_SELECT: &str = "
    SELECT d.source_id, COALESCE(s.name, d.source_name), COALESCE(s.type, d.source_type),
           s.size, s.coverage,
           d.target_id, COALESCE(t.name, d.target_name), COALESCE(t.type, d.target_type),
           t.size, t.coverage
    FROM dependencies d
    LEFT JOIN components s ON s.id = d.source_id
    LEFT JOIN components t ON t.id = d.target_id";

/// SQLite-backed implementation of [`GraphStore`].
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: &Path) -> crate::error::Result<Self> {
        let conn = Connection::open(path).map_err(StoreError::Sqlite)?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(path.to_path_buf()),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> crate::error::Result<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::Sqlite)?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Flush and close the connection.
    pub fn close(self) -> crate::error::Result<()> {
        let conn = self.conn.into_inner().unwrap_or_else(PoisonError::into_inner);
        conn.close()
            .map_err(|(_, e)| StoreError::Sqlite(e))?;
        Ok(())
    }

    fn initialize(&self) -> crate::error::Result<()> {
        let conn = self.conn.lock().expect("depgraph store mutex poisoned");

        conn.execute_batch(schema::PRAGMAS_SQL)
            .map_err(StoreError::Sqlite)?;
        // Ignored for in-memory databases
        let _ = conn.execute_batch("PRAGMA journal_mode = WAL;");

        conn.execute_batch(schema::SCHEMA_SQL)
            .map_err(StoreError::Sqlite)?;

        conn.execute(
            "INSERT OR IGNORE INTO depgraph_meta (key, value) VALUES ('schema_version', ?1)",
            params![schema::SCHEMA_VERSION],
        )
        .map_err(StoreError::Sqlite)?;

        let version: String = conn
            .query_row(
                "SELECT value FROM depgraph_meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .map_err(StoreError::Sqlite)?;
        if version != schema::SCHEMA_VERSION {
            return Err(StoreError::Migration(format!(
                "database schema version {version} does not match expected {}",
                schema::SCHEMA_VERSION
            ))
            .into());
        }

        Ok(())
    }

    fn row_to_component(row: &Row<'_>) -> rusqlite::Result<Component> {
        Ok(Component {
            id: row.get(0)?,
            name: row.get(1)?,
            kind: row.get(2)?,
            size: row.get(3)?,
            coverage: row.get(4)?,
        })
    }

    fn row_to_edge_view(row: &Row<'_>) -> rusqlite::Result<EdgeView> {
        Ok(EdgeView {
            source_id: row.get(0)?,
            source_name: row.get(1)?,
            source_type: row.get(2)?,
            source_size: row.get(3)?,
            source_coverage: row.get(4)?,
            target_id: row.get(5)?,
            target_name: row.get(6)?,
            target_type: row.get(7)?,
            target_size: row.get(8)?,
            target_coverage: row.get(9)?,
        })
    }

    fn query_components(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> crate::error::Result<Vec<Component>> {
        let mut stmt = conn.prepare(sql).map_err(StoreError::Sqlite)?;
        let rows = stmt
            .query_map(params, Self::row_to_component)
            .map_err(StoreError::Sqlite)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::Sqlite)?;
        Ok(rows)
    }

    fn query_edge_views(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> crate::error::Result<Vec<EdgeView>> {
        let mut stmt = conn.prepare(sql).map_err(StoreError::Sqlite)?;
        let rows = stmt
            .query_map(params, Self::row_to_edge_view)
            .map_err(StoreError::Sqlite)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::Sqlite)?;
        Ok(rows)
    }
}

/// Build a `LIKE` pattern matching `term` anywhere, with wildcards escaped.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[async_trait::async_trait]
impl GraphStore for SqliteStore {
    // ── Writes ─────────────────────────────────────────────────────

    async fn upsert_nodes(&self, records: &[ComponentRecord]) -> crate::error::Result<u64> {
        let conn = self.conn.lock().expect("depgraph store mutex poisoned");
        let tx = conn.unchecked_transaction().map_err(StoreError::Sqlite)?;

        let mut inserted = 0u64;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO components (id, name, type) VALUES (?1, ?2, ?3)
                     ON CONFLICT(id) DO NOTHING",
                )
                .map_err(StoreError::Sqlite)?;
            for record in records.iter().filter(|r| !r.id.is_empty()) {
                let changed = stmt
                    .execute(params![record.id, record.name, record.kind])
                    .map_err(StoreError::Sqlite)?;
                inserted += changed as u64;
            }
        }
        tx.commit().map_err(StoreError::Sqlite)?;
        debug!(batch = records.len(), inserted, "Upserted components");
        Ok(inserted)
    }

    async fn update_stats(&self, records: &[ComponentStats]) -> crate::error::Result<u64> {
        let conn = self.conn.lock().expect("depgraph store mutex poisoned");
        let tx = conn.unchecked_transaction().map_err(StoreError::Sqlite)?;

        let mut touched = 0u64;
        {
            let mut stmt = tx
                .prepare_cached(
                    "UPDATE components
                     SET size = COALESCE(?2, size), coverage = COALESCE(?3, coverage)
                     WHERE id = ?1",
                )
                .map_err(StoreError::Sqlite)?;
            for record in records
                .iter()
                .filter(|r| r.size.is_some() || r.coverage.is_some())
            {
                let changed = stmt
                    .execute(params![record.id, record.size, record.coverage])
                    .map_err(StoreError::Sqlite)?;
                touched += changed as u64;
            }
        }
        tx.commit().map_err(StoreError::Sqlite)?;
        debug!(batch = records.len(), touched, "Applied component stats");
        Ok(touched)
    }

    async fn upsert_edges(&self, records: &[DependencyEdgeRecord]) -> crate::error::Result<u64> {
        let conn = self.conn.lock().expect("depgraph store mutex poisoned");
        let tx = conn.unchecked_transaction().map_err(StoreError::Sqlite)?;

        let mut inserted = 0u64;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO dependencies
                        (source_id, target_id, source_name, source_type, target_name, target_type)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(source_id, target_id) DO NOTHING",
                )
                .map_err(StoreError::Sqlite)?;
            for edge in records.iter().filter(|e| e.is_complete()) {
                let changed = stmt
                    .execute(params![
                        edge.source_id,
                        edge.target_id,
                        edge.source_name,
                        edge.source_type,
                        edge.target_name,
                        edge.target_type,
                    ])
                    .map_err(StoreError::Sqlite)?;
                inserted += changed as u64;
            }
        }
        tx.commit().map_err(StoreError::Sqlite)?;
        debug!(batch = records.len(), inserted, "Upserted dependencies");
        Ok(inserted)
    }

    async fn clear(&self) -> crate::error::Result<()> {
        let conn = self.conn.lock().expect("depgraph store mutex poisoned");
        let tx = conn.unchecked_transaction().map_err(StoreError::Sqlite)?;
        tx.execute_batch("DELETE FROM dependencies; DELETE FROM components;")
            .map_err(StoreError::Sqlite)?;
        tx.commit().map_err(StoreError::Sqlite)?;
        Ok(())
    }

    // ── Reads ──────────────────────────────────────────────────────

    async fn get_node(&self, id: &str) -> crate::error::Result<Option<Component>> {
        let conn = self.conn.lock().expect("depgraph store mutex poisoned");
        let component = conn
            .query_row(
                &format!("SELECT {COMPONENT_COLUMNS} FROM components WHERE id = ?1"),
                params![id],
                Self::row_to_component,
            )
            .optional()
            .map_err(StoreError::Sqlite)?;
        Ok(component)
    }

    async fn list_nodes(&self) -> crate::error::Result<Vec<Component>> {
        let conn = self.conn.lock().expect("depgraph store mutex poisoned");
        Self::query_components(
            &conn,
            &format!("SELECT {COMPONENT_COLUMNS} FROM components ORDER BY rowid"),
            [],
        )
    }

    async fn search_nodes(&self, term: &str) -> crate::error::Result<Vec<Component>> {
        let conn = self.conn.lock().expect("depgraph store mutex poisoned");
        let pattern = like_pattern(term);
        #[allow(clippy::cast_possible_wrap)]
        let limit = SEARCH_LIMIT as i64;
        Self::query_components(
            &conn,
            &format!(
                "SELECT {COMPONENT_COLUMNS} FROM components
                 WHERE name LIKE ?1 ESCAPE '\\' OR id LIKE ?1 ESCAPE '\\'
                 ORDER BY rowid LIMIT ?2"
            ),
            params![pattern, limit],
        )
    }

    async fn edges_touching(&self, id: &str) -> crate::error::Result<Vec<EdgeView>> {
        let conn = self.conn.lock().expect("depgraph store mutex poisoned");
        Self::query_edge_views(
            &conn,
            &format!(
                "{EDGE_VIEW_SELECT}
                 WHERE d.source_id = ?1 OR d.target_id = ?1
                 ORDER BY d.rowid"
            ),
            params![id],
        )
    }

    async fn list_edges(&self) -> crate::error::Result<Vec<EdgeView>> {
        let conn = self.conn.lock().expect("depgraph store mutex poisoned");
        Self::query_edge_views(&conn, &format!("{EDGE_VIEW_SELECT} ORDER BY d.rowid"), [])
    }

    async fn dangling_ids(&self) -> crate::error::Result<BTreeSet<String>> {
        let conn = self.conn.lock().expect("depgraph store mutex poisoned");
        let mut stmt = conn
            .prepare(
                "SELECT source_id FROM dependencies
                 WHERE source_id NOT IN (SELECT id FROM components)
                 UNION
                 SELECT target_id FROM dependencies
                 WHERE target_id NOT IN (SELECT id FROM components)",
            )
            .map_err(StoreError::Sqlite)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(StoreError::Sqlite)?
            .collect::<rusqlite::Result<BTreeSet<_>>>()
            .map_err(StoreError::Sqlite)?;
        Ok(ids)
    }

    // ── Metadata ───────────────────────────────────────────────────

    async fn record_sync(&self, run: &SyncRun) -> crate::error::Result<()> {
        let json = serde_json::to_string(run).map_err(StoreError::Serialization)?;
        let conn = self.conn.lock().expect("depgraph store mutex poisoned");
        conn.execute(
            "INSERT INTO depgraph_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![LAST_SYNC_KEY, json],
        )
        .map_err(StoreError::Sqlite)?;
        Ok(())
    }

    async fn last_sync(&self) -> crate::error::Result<Option<SyncRun>> {
        let conn = self.conn.lock().expect("depgraph store mutex poisoned");
        let json: Option<String> = conn
            .query_row(
                "SELECT value FROM depgraph_meta WHERE key = ?1",
                params![LAST_SYNC_KEY],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::Sqlite)?;
        json.map(|j| serde_json::from_str(&j).map_err(|e| StoreError::Serialization(e).into()))
            .transpose()
    }

    async fn stats(&self) -> crate::error::Result<StoreStats> {
        let dangling_ids = self.dangling_ids().await?.len() as u64;
        let conn = self.conn.lock().expect("depgraph store mutex poisoned");

        let total_components: u64 = conn
            .query_row("SELECT COUNT(*) FROM components", [], |row| row.get(0))
            .map_err(StoreError::Sqlite)?;
        let total_edges: u64 = conn
            .query_row("SELECT COUNT(*) FROM dependencies", [], |row| row.get(0))
            .map_err(StoreError::Sqlite)?;

        let mut stmt = conn
            .prepare("SELECT COALESCE(type, '(unknown)'), COUNT(*) FROM components GROUP BY 1")
            .map_err(StoreError::Sqlite)?;
        let components_by_type: HashMap<String, u64> = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?)))
            .map_err(StoreError::Sqlite)?
            .collect::<rusqlite::Result<HashMap<_, _>>>()
            .map_err(StoreError::Sqlite)?;

        let db_size_bytes = self
            .db_path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map_or(0, |m| m.len());

        Ok(StoreStats {
            total_components,
            total_edges,
            dangling_ids,
            components_by_type,
            db_size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DepgraphError;
    use chrono::Utc;
    use uuid::Uuid;

    fn comp(id: &str, name: &str, kind: &str) -> ComponentRecord {
        ComponentRecord::new(id, Some(name), Some(kind))
    }

    fn edge(source: &str, target: &str) -> DependencyEdgeRecord {
        DependencyEdgeRecord {
            source_id: source.into(),
            source_name: Some(format!("{source}-name")),
            source_type: Some("ApexClass".into()),
            target_id: target.into(),
            target_name: Some(format!("{target}-name")),
            target_type: Some("ApexClass".into()),
        }
    }

    fn stats(id: &str, size: Option<i64>, coverage: Option<i64>) -> ComponentStats {
        ComponentStats {
            id: id.into(),
            size,
            coverage,
        }
    }

    #[tokio::test]
    async fn upsert_nodes_keeps_first_writer() {
        let store = SqliteStore::in_memory().unwrap();
        let inserted = store
            .upsert_nodes(&[comp("a1", "Foo", "ApexClass"), comp("a2", "Bar", "ApexClass")])
            .await
            .unwrap();
        assert_eq!(inserted, 2);

        let inserted = store
            .upsert_nodes(&[comp("a1", "Renamed", "ApexPage")])
            .await
            .unwrap();
        assert_eq!(inserted, 0);

        let node = store.get_node("a1").await.unwrap().unwrap();
        assert_eq!(node.name.as_deref(), Some("Foo"));
        assert_eq!(node.kind.as_deref(), Some("ApexClass"));
    }

    #[tokio::test]
    async fn upsert_nodes_skips_empty_ids() {
        let store = SqliteStore::in_memory().unwrap();
        let inserted = store
            .upsert_nodes(&[ComponentRecord::new("", Some("x"), None)])
            .await
            .unwrap();
        assert_eq!(inserted, 0);
        assert!(store.list_nodes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stats_coalesce_never_erases() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_nodes(&[comp("a", "A", "ApexClass")]).await.unwrap();

        store.update_stats(&[stats("a", Some(100), Some(80))]).await.unwrap();
        store.update_stats(&[stats("a", None, Some(90))]).await.unwrap();

        let node = store.get_node("a").await.unwrap().unwrap();
        assert_eq!(node.size, Some(100));
        assert_eq!(node.coverage, Some(90));
    }

    #[tokio::test]
    async fn stats_for_unknown_ids_are_ignored() {
        let store = SqliteStore::in_memory().unwrap();
        let touched = store
            .update_stats(&[stats("ghost", Some(1), None)])
            .await
            .unwrap();
        assert_eq!(touched, 0);
        assert!(store.get_node("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_batch_rolls_back() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .upsert_nodes(&[comp("a", "A", "ApexClass"), comp("b", "B", "ApexClass")])
            .await
            .unwrap();

        // Second record violates the coverage range check
        let err = store
            .update_stats(&[stats("a", Some(10), None), stats("b", None, Some(150))])
            .await
            .unwrap_err();
        assert!(matches!(err, DepgraphError::Store(StoreError::Sqlite(_))));

        let a = store.get_node("a").await.unwrap().unwrap();
        assert_eq!(a.size, None, "first write of the failed batch must not persist");
    }

    #[tokio::test]
    async fn edges_are_idempotent() {
        let store = SqliteStore::in_memory().unwrap();
        let batch = [edge("a", "b"), edge("a", "b"), edge("b", "a")];
        assert_eq!(store.upsert_edges(&batch).await.unwrap(), 2);
        assert_eq!(store.upsert_edges(&batch).await.unwrap(), 0);
        assert_eq!(store.list_edges().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn incomplete_edges_are_skipped() {
        let store = SqliteStore::in_memory().unwrap();
        let inserted = store.upsert_edges(&[edge("a", "")]).await.unwrap();
        assert_eq!(inserted, 0);
    }

    #[tokio::test]
    async fn edges_touching_keeps_dangling_rows() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_nodes(&[comp("a", "Alpha", "ApexClass")]).await.unwrap();
        store.update_stats(&[stats("a", Some(42), Some(75))]).await.unwrap();
        store
            .upsert_edges(&[edge("a", "b"), edge("c", "a"), edge("x", "y")])
            .await
            .unwrap();

        let views = store.edges_touching("a").await.unwrap();
        assert_eq!(views.len(), 2);

        let out = &views[0];
        assert_eq!(out.source_name.as_deref(), Some("Alpha"));
        assert_eq!(out.source_size, Some(42));
        assert_eq!(out.source_coverage, Some(75));
        assert_eq!(out.target_id, "b");
        assert_eq!(out.target_name.as_deref(), Some("b-name"));
        assert_eq!(out.target_size, None);
        assert_eq!(out.target_coverage, None);

        assert_eq!(views[1].source_id, "c");
        assert_eq!(views[1].target_size, Some(42));
    }

    #[tokio::test]
    async fn dangling_ids_lists_missing_endpoints() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_nodes(&[comp("a", "A", "ApexClass")]).await.unwrap();
        store
            .upsert_edges(&[edge("a", "b"), edge("c", "a"), edge("b", "c")])
            .await
            .unwrap();

        let dangling: Vec<String> = store.dangling_ids().await.unwrap().into_iter().collect();
        assert_eq!(dangling, vec!["b", "c"]);

        store
            .upsert_nodes(&[comp("b", "B", "ApexClass"), comp("c", "C", "ApexClass")])
            .await
            .unwrap();
        assert!(store.dangling_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_capped() {
        let store = SqliteStore::in_memory().unwrap();
        let records: Vec<ComponentRecord> = (0..60)
            .map(|i| comp(&format!("id{i}"), &format!("AccountHelper{i}"), "ApexClass"))
            .collect();
        store.upsert_nodes(&records).await.unwrap();
        store.upsert_nodes(&[comp("z", "Other", "ApexPage")]).await.unwrap();

        let hits = store.search_nodes("accounthelper").await.unwrap();
        assert_eq!(hits.len(), SEARCH_LIMIT);
        assert_eq!(hits[0].id, "id0");

        let hits = store.search_nodes("OTHER").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "z");
    }

    #[tokio::test]
    async fn search_escapes_wildcards() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .upsert_nodes(&[comp("a", "100%_done", "ApexClass"), comp("b", "100 done", "ApexClass")])
            .await
            .unwrap();
        let hits = store.search_nodes("%_").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
    }

    #[tokio::test]
    async fn clear_empties_graph() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_nodes(&[comp("a", "A", "ApexClass")]).await.unwrap();
        store.upsert_edges(&[edge("a", "b")]).await.unwrap();
        store.clear().await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_components, 0);
        assert_eq!(stats.total_edges, 0);
    }

    #[tokio::test]
    async fn sync_record_roundtrip() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.last_sync().await.unwrap().is_none());

        let run = SyncRun {
            run_id: Uuid::new_v4(),
            finished_at: Utc::now(),
            components: 3,
            edges: 1,
            failed_scopes: 0,
        };
        store.record_sync(&run).await.unwrap();
        let second = SyncRun {
            components: 4,
            ..run.clone()
        };
        store.record_sync(&second).await.unwrap();

        let last = store.last_sync().await.unwrap().unwrap();
        assert_eq!(last.run_id, run.run_id);
        assert_eq!(last.components, 4);
    }

    #[tokio::test]
    async fn stats_counts_by_type() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .upsert_nodes(&[
                comp("a", "A", "ApexClass"),
                comp("b", "B", "ApexClass"),
                ComponentRecord::new("c", None, None),
            ])
            .await
            .unwrap();
        store.upsert_edges(&[edge("a", "z")]).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_components, 3);
        assert_eq!(stats.total_edges, 1);
        assert_eq!(stats.dangling_ids, 1);
        assert_eq!(stats.components_by_type.get("ApexClass"), Some(&2));
        assert_eq!(stats.components_by_type.get("(unknown)"), Some(&1));
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[tokio::test]
    async fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");

        let store = SqliteStore::open(&path).unwrap();
        store.upsert_nodes(&[comp("a", "A", "ApexClass")]).await.unwrap();
        store.close().unwrap();

        let store = SqliteStore::open(&path).unwrap();
        assert!(store.get_node("a").await.unwrap().is_some());
        assert!(store.stats().await.unwrap().db_size_bytes > 0);
    }

    #[test]
    fn schema_version_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE depgraph_meta (key TEXT PRIMARY KEY, value TEXT NOT NULL);
                 INSERT INTO depgraph_meta VALUES ('schema_version', '0');",
            )
            .unwrap();
        }
        let err = SqliteStore::open(&path).unwrap_err();
        assert!(matches!(err, DepgraphError::Store(StoreError::Migration(_))));
    }

    #[test]
    fn like_pattern_escapes() {
        assert_eq!(like_pattern("ab"), "%ab%");
        assert_eq!(like_pattern("a%b_c\\"), "%a\\%b\\_c\\\\%");
    }
}
