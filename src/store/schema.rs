//! Schema management and migrations

use crate::error::{OverlayError, OverlayResult};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

/// Schema version - increment when making schema changes
const SCHEMA_VERSION: i32 = 1;

/// Apply all pending migrations
pub fn apply_migrations(conn: &Connection) -> OverlayResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version = current_version(conn)?;
    debug!(current_version, target_version = SCHEMA_VERSION, "Checking migrations");

    if current_version < 1 {
        info!(from = current_version, to = SCHEMA_VERSION, "Applying schema migrations");
        apply_migration_v1(conn)?;
    }

    Ok(())
}

fn current_version(conn: &Connection) -> OverlayResult<i32> {
    let version: Option<i32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get::<_, Option<i32>>(0)
        })
        .optional()?
        .flatten();

    Ok(version.unwrap_or(0))
}

fn apply_migration_v1(conn: &Connection) -> OverlayResult<()> {
    conn.execute_batch(SCHEMA_V1)
        .map_err(|e| OverlayError::Storage(format!("Failed to apply v1 schema: {}", e)))?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (version) VALUES (?1)",
        [1],
    )?;
    info!("Migration v1 applied");
    Ok(())
}

/// Overlay tables. `external_property_id` uniqueness is what makes
/// create-on-first-write safe under concurrent writers.
const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS property_extensions (
    id TEXT PRIMARY KEY NOT NULL,
    external_property_id TEXT NOT NULL UNIQUE,
    priority INTEGER NOT NULL DEFAULT 0,
    internal_notes TEXT,
    is_hidden INTEGER NOT NULL DEFAULT 0 CHECK (is_hidden IN (0, 1)),
    is_featured_popular INTEGER NOT NULL DEFAULT 0 CHECK (is_featured_popular IN (0, 1)),
    orphaned_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS promotions (
    id TEXT PRIMARY KEY NOT NULL,
    extension_id TEXT NOT NULL REFERENCES property_extensions(id) ON DELETE CASCADE,
    label TEXT NOT NULL CHECK (length(trim(label)) > 0),
    promotion_type TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1 CHECK (is_active IN (0, 1)),
    discounted_price INTEGER,
    discounted_rental_price INTEGER,
    position INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_promotions_extension
    ON promotions(extension_id, position);

CREATE TABLE IF NOT EXISTS property_tags (
    id TEXT PRIMARY KEY NOT NULL,
    extension_id TEXT NOT NULL REFERENCES property_extensions(id) ON DELETE CASCADE,
    name TEXT NOT NULL COLLATE NOCASE,
    color TEXT,
    position INTEGER NOT NULL,
    UNIQUE (extension_id, name)
);

CREATE INDEX IF NOT EXISTS idx_property_tags_extension
    ON property_tags(extension_id, position);
"#;
