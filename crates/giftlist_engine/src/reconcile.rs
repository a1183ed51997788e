use std::sync::Arc;

use client_logging::{client_info, client_warn};
use serde_json::Value;

use giftlist_core::{ChangeTracker, EntityId, FieldMap, FieldValue, Selection, TrackerError};

use crate::{OperationReport, ReconcileError, UniformOperation, WishlistService};

/// One bulk-edit session: a change tracker, a selection and the service
/// that mutations are submitted to.
///
/// Field edits and uniform operations are disjoint paths: the tracker
/// drives `apply_field_edits`, the selection drives
/// `apply_uniform_operation`. Each apply makes exactly one mutation call;
/// retrying is the caller's decision.
pub struct BulkReconciler {
    service: Arc<dyn WishlistService>,
    tracker: ChangeTracker,
    selection: Selection,
}

impl BulkReconciler {
    pub fn new(service: Arc<dyn WishlistService>) -> Self {
        Self {
            service,
            tracker: ChangeTracker::new(),
            selection: Selection::new(),
        }
    }

    // Tracker surface.

    pub fn set_baseline(&mut self, entities: impl IntoIterator<Item = (EntityId, FieldMap)>) {
        self.tracker.set_baseline(entities);
    }

    pub fn record_change(
        &mut self,
        entity_id: EntityId,
        field: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Result<(), TrackerError> {
        self.tracker.record_change(entity_id, field, value)
    }

    pub fn is_field_changed(&self, entity_id: EntityId, field: &str) -> bool {
        self.tracker.is_field_changed(entity_id, field)
    }

    pub fn has_any_change(&self) -> bool {
        self.tracker.has_any_change()
    }

    // Selection surface. Pure set operations, no remote effects.

    pub fn select_all(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        self.selection.select_all(ids);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn toggle(&mut self, id: EntityId) -> bool {
        self.selection.toggle(id)
    }

    pub fn selection_len(&self) -> usize {
        self.selection.len()
    }

    /// Submits the tracker's diff as one batched mutation.
    ///
    /// On success the tracker is cleared and the service's updated count
    /// returned. On remote failure the pending edits are deliberately kept
    /// so a retry does not require re-entering values.
    pub async fn apply_field_edits(&mut self) -> Result<u64, ReconcileError> {
        if !self.tracker.has_any_change() {
            return Err(ReconcileError::NoChanges);
        }
        let diff = self.tracker.diff();
        client_info!("submitting field edits for {} entities", diff.len());
        match self.service.submit_field_edits(&diff).await {
            Ok(updated_count) => {
                self.tracker.clear();
                Ok(updated_count)
            }
            Err(err) => {
                client_warn!("field edit submission failed: {err}");
                Err(ReconcileError::RemoteMutationFailed {
                    message: err.to_string(),
                })
            }
        }
    }

    /// Applies one uniform operation over the whole selection in a single
    /// batched request. The service's own report is surfaced verbatim,
    /// including any partial outcome it chooses to describe.
    pub async fn apply_uniform_operation(
        &mut self,
        operation: UniformOperation,
        payload: Value,
    ) -> Result<OperationReport, ReconcileError> {
        if self.selection.is_empty() {
            return Err(ReconcileError::EmptySelection);
        }
        let ids = self.selection.ids();
        client_info!("submitting {operation} for {} items", ids.len());
        self.service
            .submit_uniform_operation(operation, &ids, &payload)
            .await
            .map_err(|err| {
                client_warn!("{operation} submission failed: {err}");
                ReconcileError::RemoteMutationFailed {
                    message: err.to_string(),
                }
            })
    }
}
