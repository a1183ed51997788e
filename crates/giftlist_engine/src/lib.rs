//! Giftlist engine: async metadata-fetch jobs and bulk-edit reconciliation.
mod error;
mod events;
mod job;
mod reconcile;
mod remote;
mod types;

pub use error::{JobError, ReconcileError, ServiceError, ServiceErrorKind};
pub use events::{ChannelEventSink, EventDispatcher, EventSink, JobEvent, SubscriptionId};
pub use job::{JobClient, JobHandle};
pub use reconcile::BulkReconciler;
pub use remote::{
    HttpMetadataService, HttpWishlistService, MetadataService, ServiceSettings, WishlistService,
};
pub use types::{
    ItemMetadata, JobId, JobStatus, OperationReport, StatusReport, UniformOperation,
};
