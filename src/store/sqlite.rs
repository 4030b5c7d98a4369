//! ExtensionStore implementation for SQLite

use crate::error::{OverlayError, OverlayResult};
use crate::models::{FlagPatch, Promotion, PromotionType, PropertyExtension, PropertyTag};
use crate::store::connection::SqlitePool;
use crate::store::{ExtensionStore, PromotionDraft};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

/// Bound parameters per `IN (...)` lookup
const ID_CHUNK: usize = 500;

const EXTENSION_COLUMNS: &str = "id, external_property_id, priority, internal_notes, \
     is_hidden, is_featured_popular, orphaned_at, created_at, updated_at";

/// Single-statement create-or-patch. NULL parameters keep the stored value,
/// an empty notes string clears the notes.
const UPSERT_FLAGS: &str = r#"
    INSERT INTO property_extensions
        (id, external_property_id, priority, internal_notes, is_hidden, is_featured_popular,
         created_at, updated_at)
    VALUES (?1, ?2, COALESCE(?3, 0), NULLIF(?4, ''), COALESCE(?5, 0), COALESCE(?6, 0), ?7, ?7)
    ON CONFLICT(external_property_id) DO UPDATE SET
        priority = COALESCE(?3, priority),
        internal_notes = CASE WHEN ?4 IS NULL THEN internal_notes ELSE NULLIF(?4, '') END,
        is_hidden = COALESCE(?5, is_hidden),
        is_featured_popular = COALESCE(?6, is_featured_popular),
        updated_at = ?7
"#;

/// SQLite implementation of ExtensionStore
#[derive(Clone)]
pub struct SqliteExtensionStore {
    pool: SqlitePool,
}

impl SqliteExtensionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Run blocking SQLite work off the async runtime
    async fn run<F, T>(&self, f: F) -> OverlayResult<T>
    where
        F: FnOnce(&mut Connection) -> OverlayResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || pool.with_connection_mut(f)).await?
    }
}

#[async_trait]
impl ExtensionStore for SqliteExtensionStore {
    async fn get(&self, external_id: &str) -> OverlayResult<Option<PropertyExtension>> {
        let external_id = external_id.to_string();
        self.run(move |conn| load_one(conn, &external_id)).await
    }

    async fn get_many(
        &self,
        external_ids: &HashSet<String>,
    ) -> OverlayResult<HashMap<String, PropertyExtension>> {
        if external_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<String> = external_ids.iter().cloned().collect();

        self.run(move |conn| {
            let extensions = load_extensions(conn, &ids)?;
            debug!("Loaded {} overlays for {} ids", extensions.len(), ids.len());
            Ok(extensions
                .into_iter()
                .map(|ext| (ext.external_property_id.clone(), ext))
                .collect())
        })
        .await
    }

    async fn ensure(&self, external_id: &str) -> OverlayResult<PropertyExtension> {
        let external_id = external_id.to_string();
        self.run(move |conn| {
            ensure_row(conn, &external_id, Utc::now())?;
            load_required(conn, &external_id)
        })
        .await
    }

    async fn upsert_flags(
        &self,
        external_id: &str,
        patch: &FlagPatch,
    ) -> OverlayResult<PropertyExtension> {
        let external_id = external_id.to_string();
        let patch = patch.clone();

        self.run(move |conn| {
            conn.execute(
                UPSERT_FLAGS,
                params![
                    Uuid::new_v4().to_string(),
                    external_id,
                    patch.priority,
                    patch.internal_notes.as_deref(),
                    patch.is_hidden,
                    patch.is_featured_popular,
                    Utc::now(),
                ],
            )?;
            debug!(external_id = %external_id, ?patch, "Upserted overlay flags");
            load_required(conn, &external_id)
        })
        .await
    }

    async fn insert_promotion(
        &self,
        external_id: &str,
        draft: &PromotionDraft,
    ) -> OverlayResult<PropertyExtension> {
        let external_id = external_id.to_string();
        let draft = draft.clone();

        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let now = Utc::now();
            let extension_id = ensure_row(&tx, &external_id, now)?;

            let position: i64 = tx.query_row(
                "SELECT COALESCE(MAX(position), -1) + 1 FROM promotions WHERE extension_id = ?1",
                [&extension_id],
                |row| row.get(0),
            )?;
            let promotion_id = Uuid::new_v4().to_string();

            tx.execute(
                r#"
                INSERT INTO promotions (id, extension_id, label, promotion_type, is_active,
                                        discounted_price, discounted_rental_price, position,
                                        created_at)
                VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?7, ?8)
                "#,
                params![
                    promotion_id,
                    extension_id,
                    draft.label,
                    draft.promotion_type.as_str(),
                    draft.discounted_price,
                    draft.discounted_rental_price,
                    position,
                    now,
                ],
            )?;
            touch(&tx, &extension_id, now)?;

            let extension = load_required(&tx, &external_id)?;
            tx.commit()?;

            info!(external_id = %external_id, promotion_id = %promotion_id, "Promotion added");
            Ok(extension)
        })
        .await
    }

    async fn delete_promotion(
        &self,
        external_id: &str,
        promotion_id: &str,
    ) -> OverlayResult<PropertyExtension> {
        let external_id = external_id.to_string();
        let promotion_id = promotion_id.to_string();

        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let extension_id = require_extension_id(&tx, &external_id)?;

            let removed = tx.execute(
                "DELETE FROM promotions WHERE id = ?1 AND extension_id = ?2",
                params![promotion_id, extension_id],
            )?;
            if removed == 0 {
                return Err(OverlayError::NotFound(format!(
                    "promotion {} on property {}",
                    promotion_id, external_id
                )));
            }
            touch(&tx, &extension_id, Utc::now())?;

            let extension = load_required(&tx, &external_id)?;
            tx.commit()?;

            info!(external_id = %external_id, promotion_id = %promotion_id, "Promotion removed");
            Ok(extension)
        })
        .await
    }

    async fn set_promotion_active(
        &self,
        external_id: &str,
        promotion_id: &str,
        active: bool,
    ) -> OverlayResult<PropertyExtension> {
        let external_id = external_id.to_string();
        let promotion_id = promotion_id.to_string();

        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let extension_id = require_extension_id(&tx, &external_id)?;

            let updated = tx.execute(
                "UPDATE promotions SET is_active = ?1 WHERE id = ?2 AND extension_id = ?3",
                params![active, promotion_id, extension_id],
            )?;
            if updated == 0 {
                return Err(OverlayError::NotFound(format!(
                    "promotion {} on property {}",
                    promotion_id, external_id
                )));
            }
            touch(&tx, &extension_id, Utc::now())?;

            let extension = load_required(&tx, &external_id)?;
            tx.commit()?;
            Ok(extension)
        })
        .await
    }

    async fn upsert_tag(
        &self,
        external_id: &str,
        name: &str,
        color: Option<&str>,
    ) -> OverlayResult<PropertyExtension> {
        let external_id = external_id.to_string();
        let name = name.to_string();
        let color = color.map(str::to_string);

        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let now = Utc::now();
            let extension_id = ensure_row(&tx, &external_id, now)?;

            tx.execute(
                r#"
                INSERT INTO property_tags (id, extension_id, name, color, position)
                VALUES (?1, ?2, ?3, ?4,
                        (SELECT COALESCE(MAX(position), -1) + 1
                         FROM property_tags WHERE extension_id = ?2))
                ON CONFLICT(extension_id, name) DO UPDATE SET
                    color = COALESCE(excluded.color, color)
                "#,
                params![Uuid::new_v4().to_string(), extension_id, name, color],
            )?;
            touch(&tx, &extension_id, now)?;

            let extension = load_required(&tx, &external_id)?;
            tx.commit()?;
            Ok(extension)
        })
        .await
    }

    async fn delete_tag(
        &self,
        external_id: &str,
        tag_id: &str,
    ) -> OverlayResult<PropertyExtension> {
        let external_id = external_id.to_string();
        let tag_id = tag_id.to_string();

        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let extension_id = require_extension_id(&tx, &external_id)?;

            let removed = tx.execute(
                "DELETE FROM property_tags WHERE id = ?1 AND extension_id = ?2",
                params![tag_id, extension_id],
            )?;
            if removed == 0 {
                return Err(OverlayError::NotFound(format!(
                    "tag {} on property {}",
                    tag_id, external_id
                )));
            }
            touch(&tx, &extension_id, Utc::now())?;

            let extension = load_required(&tx, &external_id)?;
            tx.commit()?;
            Ok(extension)
        })
        .await
    }

    async fn list_external_ids(&self) -> OverlayResult<Vec<String>> {
        self.run(|conn| {
            let mut stmt = conn.prepare(
                "SELECT external_property_id FROM property_extensions ORDER BY external_property_id",
            )?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(ids)
        })
        .await
    }

    async fn mark_orphans(
        &self,
        external_ids: &[String],
        at: DateTime<Utc>,
    ) -> OverlayResult<usize> {
        let ids = external_ids.to_vec();
        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let mut marked = 0;
            {
                let mut stmt = tx.prepare(
                    "UPDATE property_extensions SET orphaned_at = ?1 \
                     WHERE external_property_id = ?2 AND orphaned_at IS NULL",
                )?;
                for id in &ids {
                    marked += stmt.execute(params![at, id])?;
                }
            }
            tx.commit()?;
            Ok(marked)
        })
        .await
    }

    async fn clear_orphans(&self, external_ids: &[String]) -> OverlayResult<usize> {
        let ids = external_ids.to_vec();
        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let mut cleared = 0;
            {
                let mut stmt = tx.prepare(
                    "UPDATE property_extensions SET orphaned_at = NULL \
                     WHERE external_property_id = ?1 AND orphaned_at IS NOT NULL",
                )?;
                for id in &ids {
                    cleared += stmt.execute([id])?;
                }
            }
            tx.commit()?;
            Ok(cleared)
        })
        .await
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Create-if-absent; returns the extension's row id
fn ensure_row(conn: &Connection, external_id: &str, now: DateTime<Utc>) -> OverlayResult<String> {
    conn.execute(
        r#"
        INSERT INTO property_extensions (id, external_property_id, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?3)
        ON CONFLICT(external_property_id) DO NOTHING
        "#,
        params![Uuid::new_v4().to_string(), external_id, now],
    )?;
    require_extension_id(conn, external_id)
}

fn require_extension_id(conn: &Connection, external_id: &str) -> OverlayResult<String> {
    conn.query_row(
        "SELECT id FROM property_extensions WHERE external_property_id = ?1",
        [external_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| OverlayError::NotFound(format!("extension for property {}", external_id)))
}

fn touch(conn: &Connection, extension_id: &str, now: DateTime<Utc>) -> OverlayResult<()> {
    conn.execute(
        "UPDATE property_extensions SET updated_at = ?1 WHERE id = ?2",
        params![now, extension_id],
    )?;
    Ok(())
}

fn load_one(conn: &Connection, external_id: &str) -> OverlayResult<Option<PropertyExtension>> {
    Ok(load_extensions(conn, &[external_id.to_string()])?
        .into_iter()
        .next())
}

fn load_required(conn: &Connection, external_id: &str) -> OverlayResult<PropertyExtension> {
    load_one(conn, external_id)?
        .ok_or_else(|| OverlayError::NotFound(format!("extension for property {}", external_id)))
}

fn load_extensions(
    conn: &Connection,
    external_ids: &[String],
) -> OverlayResult<Vec<PropertyExtension>> {
    let mut extensions = Vec::new();
    for chunk in external_ids.chunks(ID_CHUNK) {
        let sql = format!(
            "SELECT {} FROM property_extensions WHERE external_property_id IN ({})",
            EXTENSION_COLUMNS,
            placeholders(chunk.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(chunk.iter()), row_to_extension)?;
        for row in rows {
            extensions.push(row?);
        }
    }
    attach_children(conn, &mut extensions)?;
    Ok(extensions)
}

/// Fill promotions and tags, each in stored position order
fn attach_children(conn: &Connection, extensions: &mut [PropertyExtension]) -> OverlayResult<()> {
    let index: HashMap<String, usize> = extensions
        .iter()
        .enumerate()
        .filter_map(|(i, ext)| ext.id.clone().map(|id| (id, i)))
        .collect();
    let ids: Vec<&String> = index.keys().collect();

    for chunk in ids.chunks(ID_CHUNK) {
        let sql = format!(
            "SELECT extension_id, id, label, promotion_type, is_active, discounted_price, \
             discounted_rental_price FROM promotions WHERE extension_id IN ({}) \
             ORDER BY extension_id, position",
            placeholders(chunk.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(chunk.iter()), row_to_promotion)?;
        for row in rows {
            let (extension_id, promotion) = row?;
            if let Some(&i) = index.get(&extension_id) {
                extensions[i].promotions.push(promotion);
            }
        }

        let sql = format!(
            "SELECT extension_id, id, name, color FROM property_tags \
             WHERE extension_id IN ({}) ORDER BY extension_id, position",
            placeholders(chunk.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                PropertyTag {
                    id: row.get(1)?,
                    name: row.get(2)?,
                    color: row.get(3)?,
                },
            ))
        })?;
        for row in rows {
            let (extension_id, tag) = row?;
            if let Some(&i) = index.get(&extension_id) {
                extensions[i].tags.push(tag);
            }
        }
    }
    Ok(())
}

fn row_to_extension(row: &Row<'_>) -> rusqlite::Result<PropertyExtension> {
    Ok(PropertyExtension {
        id: Some(row.get(0)?),
        external_property_id: row.get(1)?,
        priority: row.get(2)?,
        internal_notes: row.get(3)?,
        is_hidden: row.get(4)?,
        is_featured_popular: row.get(5)?,
        promotions: Vec::new(),
        tags: Vec::new(),
        orphaned_at: row.get(6)?,
        created_at: Some(row.get(7)?),
        updated_at: Some(row.get(8)?),
    })
}

fn row_to_promotion(row: &Row<'_>) -> rusqlite::Result<(String, Promotion)> {
    let kind: String = row.get(3)?;
    Ok((
        row.get(0)?,
        Promotion {
            id: row.get(1)?,
            label: row.get(2)?,
            promotion_type: PromotionType::parse_lenient(&kind),
            is_active: row.get(4)?,
            discounted_price: row.get(5)?,
            discounted_rental_price: row.get(6)?,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;

    fn store() -> SqliteExtensionStore {
        SqliteExtensionStore::new(SqlitePool::memory().expect("Failed to create pool"))
    }

    fn draft(label: &str, promotion_type: PromotionType) -> PromotionDraft {
        PromotionDraft {
            label: label.to_string(),
            promotion_type,
            discounted_price: None,
            discounted_rental_price: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_then_patches_only_given_fields() {
        let store = store();

        let created = store
            .upsert_flags(
                "P-1",
                &FlagPatch {
                    is_hidden: Some(true),
                    internal_notes: Some("owner abroad".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(created.is_persisted());
        assert!(created.is_hidden);
        assert!(!created.is_featured_popular);
        assert_eq!(created.priority, 0);

        let patched = store
            .upsert_flags(
                "P-1",
                &FlagPatch {
                    is_featured_popular: Some(true),
                    priority: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(patched.id, created.id);
        assert!(patched.is_hidden);
        assert!(patched.is_featured_popular);
        assert_eq!(patched.priority, 5);
        assert_eq!(patched.internal_notes.as_deref(), Some("owner abroad"));
    }

    #[tokio::test]
    async fn test_empty_notes_clear_stored_notes() {
        let store = store();
        store
            .upsert_flags(
                "P-1",
                &FlagPatch {
                    internal_notes: Some("call before visit".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let cleared = store
            .upsert_flags(
                "P-1",
                &FlagPatch {
                    internal_notes: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(cleared.internal_notes.is_none());
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let store = store();
        let first = store.ensure("P-1").await.unwrap();
        let second = store.ensure("P-1").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.list_external_ids().await.unwrap(), vec!["P-1".to_string()]);
    }

    #[tokio::test]
    async fn test_get_many_omits_missing_ids() {
        let store = store();
        store.ensure("P-1").await.unwrap();
        store
            .insert_promotion("P-2", &draft("Hot deal", PromotionType::Hot))
            .await
            .unwrap();

        let ids: HashSet<String> = ["P-1", "P-2", "P-3"].iter().map(|s| s.to_string()).collect();
        let found = store.get_many(&ids).await.unwrap();

        assert_eq!(found.len(), 2);
        assert!(!found.contains_key("P-3"));
        assert_eq!(found["P-2"].promotions.len(), 1);
        assert!(found["P-1"].promotions.is_empty());
        assert!(store.get("P-3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_promotions_keep_insertion_order() {
        let store = store();
        for label in ["first", "second", "third"] {
            store
                .insert_promotion("P-1", &draft(label, PromotionType::New))
                .await
                .unwrap();
        }
        let ext = store.get("P-1").await.unwrap().unwrap();
        let labels: Vec<&str> = ext.promotions.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["first", "second", "third"]);
        assert!(ext.promotions.iter().all(|p| p.is_active));
    }

    #[tokio::test]
    async fn test_delete_promotion_scoped_to_extension() {
        let store = store();
        let a = store
            .insert_promotion("P-A", &draft("A", PromotionType::Hot))
            .await
            .unwrap();
        store.ensure("P-B").await.unwrap();
        let promo_id = a.promotions[0].id.clone();

        let wrong_owner = store.delete_promotion("P-B", &promo_id).await;
        assert!(matches!(wrong_owner, Err(OverlayError::NotFound(_))));

        let no_extension = store.delete_promotion("P-Z", &promo_id).await;
        assert!(matches!(no_extension, Err(OverlayError::NotFound(_))));

        let after = store.delete_promotion("P-A", &promo_id).await.unwrap();
        assert!(after.promotions.is_empty());

        let again = store.delete_promotion("P-A", &promo_id).await;
        assert!(matches!(again, Err(OverlayError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_toggle_promotion_active() {
        let store = store();
        let ext = store
            .insert_promotion("P-1", &draft("Limited", PromotionType::Limited))
            .await
            .unwrap();
        let promo_id = ext.promotions[0].id.clone();

        let off = store.set_promotion_active("P-1", &promo_id, false).await.unwrap();
        assert!(!off.has_active_promotion());

        let missing = store.set_promotion_active("P-1", "nope", true).await;
        assert!(matches!(missing, Err(OverlayError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_stored_promotion_type_reads_as_unknown() {
        let pool = SqlitePool::memory().unwrap();
        let store = SqliteExtensionStore::new(pool.clone());
        let ext = store
            .insert_promotion("P-1", &draft("Old", PromotionType::Hot))
            .await
            .unwrap();

        pool.with_connection(|conn| {
            conn.execute(
                "UPDATE promotions SET promotion_type = 'clearance' WHERE id = ?1",
                [&ext.promotions[0].id],
            )?;
            Ok(())
        })
        .unwrap();

        let reloaded = store.get("P-1").await.unwrap().unwrap();
        assert_eq!(reloaded.promotions[0].promotion_type, PromotionType::Unknown);
    }

    #[tokio::test]
    async fn test_duplicate_tag_name_updates_instead_of_duplicating() {
        let store = store();
        store.upsert_tag("P-1", "Pet friendly", None).await.unwrap();
        let ext = store
            .upsert_tag("P-1", "pet FRIENDLY", Some("#00ff00"))
            .await
            .unwrap();

        assert_eq!(ext.tags.len(), 1);
        assert_eq!(ext.tags[0].name, "Pet friendly");
        assert_eq!(ext.tags[0].color.as_deref(), Some("#00ff00"));

        let tag_id = ext.tags[0].id.clone();
        let removed = store.delete_tag("P-1", &tag_id).await.unwrap();
        assert!(removed.tags.is_empty());
        assert!(matches!(
            store.delete_tag("P-1", &tag_id).await,
            Err(OverlayError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_mark_and_clear_orphans() {
        let store = store();
        store.ensure("P-1").await.unwrap();
        store.ensure("P-2").await.unwrap();

        let ids = vec!["P-1".to_string()];
        assert_eq!(store.mark_orphans(&ids, Utc::now()).await.unwrap(), 1);
        assert_eq!(store.mark_orphans(&ids, Utc::now()).await.unwrap(), 0);
        assert!(store.get("P-1").await.unwrap().unwrap().orphaned_at.is_some());
        assert!(store.get("P-2").await.unwrap().unwrap().orphaned_at.is_none());

        assert_eq!(store.clear_orphans(&ids).await.unwrap(), 1);
        assert!(store.get("P-1").await.unwrap().unwrap().orphaned_at.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_from_separate_connections_yield_one_row() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("overlay.db");
        let store_a = SqliteExtensionStore::new(SqlitePool::new(StoreConfig::new(&path)).unwrap());
        let store_b = SqliteExtensionStore::new(SqlitePool::new(StoreConfig::new(&path)).unwrap());

        for round in 0..20 {
            let id = format!("P-{}", round);
            let hide = FlagPatch {
                is_hidden: Some(true),
                ..Default::default()
            };
            let feature = FlagPatch {
                is_featured_popular: Some(true),
                ..Default::default()
            };
            let (a, b) = tokio::join!(
                store_a.upsert_flags(&id, &hide),
                store_b.upsert_flags(&id, &feature)
            );
            assert_eq!(a.unwrap().id, b.unwrap().id);

            let stored = store_a.get(&id).await.unwrap().unwrap();
            assert!(stored.is_hidden);
            assert!(stored.is_featured_popular);
        }

        assert_eq!(store_b.list_external_ids().await.unwrap().len(), 20);
    }
}
