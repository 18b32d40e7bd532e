//! Services layer for user-service.
//!
//! Collaborator clients (identity provider, profile store) and the
//! coordinators built on top of them.

pub mod error;
mod identity;
pub mod metrics;
mod profiles;
mod provisioning;
mod reconciliation;
mod users;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use error::ServiceError;
pub use identity::{HttpIdentityProvider, IdentityError, IdentityProvider, MockIdentityProvider};
pub use profiles::{MockProfileStore, PgProfileStore, ProfileStore, StoreError};
pub use provisioning::UserProvisioner;
pub use reconciliation::Reconciler;
pub use users::UserDirectory;

/// Locks a test-double mutex, recovering the data if a panicking test
/// poisoned it.
pub(crate) fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
