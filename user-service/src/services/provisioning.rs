//! User provisioning coordinator.
//!
//! A user is a pair: an identity account (credentials, owned by the identity
//! provider) and a profile row keyed by the same id. Creation writes the
//! identity account first, then the profile; if the profile write fails the
//! identity account is deleted again so that either both exist or neither
//! does. If that compensating delete also fails the identity account is left
//! orphaned and only logged.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::identity::{IdentityError, IdentityProvider};
use super::metrics::{record_provisioning, record_rollback};
use super::profiles::ProfileStore;
use super::ServiceError;
use crate::dtos::users::CreateUserRequest;
use crate::models::{NewIdentityAccount, UserProfile};

#[derive(Clone)]
pub struct UserProvisioner {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
}

impl UserProvisioner {
    pub fn new(identity: Arc<dyn IdentityProvider>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { identity, profiles }
    }

    /// Validates `req`, creates the identity account, then the profile.
    ///
    /// Side effects per call: at most one identity create, at most one
    /// profile insert, at most one compensating identity delete.
    pub async fn create_user(&self, req: CreateUserRequest) -> Result<UserProfile, ServiceError> {
        if let Err(errors) = req.validate() {
            record_provisioning("invalid");
            return Err(errors.into());
        }
        let new_user = req.into_new_user()?;

        let account = self
            .identity
            .create_account(&NewIdentityAccount::from(&new_user))
            .await
            .map_err(|e| {
                match &e {
                    IdentityError::EmailTaken => {
                        tracing::info!(email = %new_user.email, "Email already registered");
                        record_provisioning("conflict");
                    }
                    other => {
                        tracing::error!(
                            email = %new_user.email,
                            error = %other,
                            "Identity account creation failed"
                        );
                        record_provisioning("identity_failed");
                    }
                }
                ServiceError::from(e)
            })?;

        tracing::info!(user_id = %account.id, email = %new_user.email, "Identity account created");

        let profile = UserProfile::for_account(account.id, &new_user);
        let inserted = AssertUnwindSafe(self.profiles.insert_profile(&profile))
            .catch_unwind()
            .await;

        match inserted {
            Ok(Ok(saved)) => {
                tracing::info!(user_id = %saved.id, rol = %saved.rol, "User provisioned");
                record_provisioning("created");
                Ok(saved)
            }
            Ok(Err(e)) => {
                tracing::error!(
                    user_id = %account.id,
                    error = %e,
                    "Profile insert failed, rolling back identity account"
                );
                record_provisioning("rolled_back");
                self.roll_back(account.id).await;
                Err(ServiceError::ProfileInsert(e))
            }
            Err(panic) => {
                tracing::error!(
                    user_id = %account.id,
                    "Profile insert panicked, rolling back identity account"
                );
                record_provisioning("rolled_back");
                self.roll_back(account.id).await;
                std::panic::resume_unwind(panic)
            }
        }
    }

    /// Single compensating delete. Its failure is logged, never returned, so
    /// the caller still sees the error that caused the rollback.
    async fn roll_back(&self, account_id: Uuid) {
        match self.identity.delete_account(account_id).await {
            Ok(()) => {
                tracing::info!(user_id = %account_id, "Identity account rolled back");
                record_rollback("succeeded");
            }
            Err(e) => {
                tracing::error!(
                    user_id = %account_id,
                    error = %e,
                    "Compensating delete failed; identity account left orphaned"
                );
                record_rollback("failed");
            }
        }
    }

    /// Deletes the identity account, then the profile. No compensation: if
    /// the profile delete fails the identity account is already gone.
    pub async fn delete_user(&self, id: Uuid) -> Result<(), ServiceError> {
        match self.identity.delete_account(id).await {
            Ok(()) => tracing::info!(user_id = %id, "Identity account deleted"),
            Err(IdentityError::NotFound) => {
                tracing::warn!(
                    user_id = %id,
                    "Identity account already absent, deleting profile only"
                )
            }
            Err(e) => {
                tracing::error!(user_id = %id, error = %e, "Identity account delete failed");
                return Err(e.into());
            }
        }

        if !self.profiles.delete_profile(id).await? {
            return Err(ServiceError::UserNotFound);
        }

        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }
}
