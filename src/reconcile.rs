//! Marks overlays whose property disappeared from the hub.
//!
//! Orphans are flagged with a timestamp and never deleted, so admin notes and
//! promotion history survive. A property that comes back is unflagged.

use crate::catalog::Catalog;
use crate::error::OverlayResult;
use crate::hub::HubFilters;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// Stored overlays examined
    pub scanned: usize,
    /// Properties currently served by the hub
    pub live: usize,
    pub newly_orphaned: usize,
    pub restored: usize,
    /// Hub listing was truncated or changed while paging, so nothing was marked
    pub skipped_marking: bool,
}

/// Compare stored overlays with the live hub listing. A hub error aborts before any write.
pub async fn reconcile(catalog: &Catalog) -> OverlayResult<ReconcileReport> {
    let collected = catalog.collect_canonical(&HubFilters::default()).await?;
    let live: HashSet<String> = collected.records.iter().map(|p| p.id.clone()).collect();

    let store = catalog.store();
    let stored = store.list_external_ids().await?;
    let (present, missing): (Vec<String>, Vec<String>) =
        stored.iter().cloned().partition(|id| live.contains(id));

    let mut report = ReconcileReport {
        scanned: stored.len(),
        live: live.len(),
        ..Default::default()
    };

    report.restored = store.clear_orphans(&present).await?;

    if !collected.is_complete() {
        warn!(
            truncated = collected.truncated,
            drifted = collected.drifted,
            "Hub listing incomplete; not marking {} unmatched overlays",
            missing.len()
        );
        report.skipped_marking = true;
    } else {
        report.newly_orphaned = store.mark_orphans(&missing, Utc::now()).await?;
    }

    info!(
        "🧹 Reconciled {} overlays: {} newly orphaned, {} restored",
        report.scanned, report.newly_orphaned, report.restored
    );
    Ok(report)
}
