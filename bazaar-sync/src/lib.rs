//! Bazaar Sync - Optimistic Mutations and Realtime Reconciliation
//!
//! Keeps an ordered local view of a remote collection in step with the
//! remote store through two cooperating halves that share one state
//! lock:
//!
//! - the [`Coordinator`] applies mutations to the view immediately,
//!   issues the remote call, and rolls the view back element-for-element
//!   if the call fails;
//! - the [`Reconciler`] folds pushed [`RemoteChange`]s into the same
//!   view, matching this client's own create echoes to their pending
//!   optimistic rows so nothing appears twice.
//!
//! [`RemoteChange`]: bazaar_core::RemoteChange

pub mod coordinator;
pub mod patch;
pub mod reconciler;
pub mod remote;
pub mod state;
pub mod view;

pub use coordinator::Coordinator;
pub use patch::apply_patch;
pub use reconciler::Reconciler;
pub use remote::RemoteSource;
pub use state::{MutationStatus, OptimisticRecord, PendingOp, SharedState, SyncState};
pub use view::CollectionView;
