use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::profiles::ProfileStore;
use super::ServiceError;
use crate::dtos::users::UpdateUserRequest;
use crate::models::UserProfile;

/// Read and update access to profiles. Updates touch the profile row only;
/// the identity account is not kept in step.
#[derive(Clone)]
pub struct UserDirectory {
    profiles: Arc<dyn ProfileStore>,
}

impl UserDirectory {
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }

    pub async fn list_users(&self) -> Result<Vec<UserProfile>, ServiceError> {
        Ok(self.profiles.list_profiles().await?)
    }

    pub async fn get_user(&self, id: Uuid) -> Result<UserProfile, ServiceError> {
        self.profiles
            .find_profile(id)
            .await?
            .ok_or(ServiceError::UserNotFound)
    }

    pub async fn update_user(
        &self,
        id: Uuid,
        req: UpdateUserRequest,
    ) -> Result<UserProfile, ServiceError> {
        req.validate()?;
        let changes = req.into_changes()?;
        if changes.is_empty() {
            return Err(ServiceError::InvalidInput(
                "No hay campos para actualizar".to_string(),
            ));
        }

        let updated = self
            .profiles
            .update_profile(id, &changes)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        tracing::info!(user_id = %id, "Profile updated");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, Role};
    use crate::services::MockProfileStore;
    use secrecy::SecretString;

    fn seeded() -> (Arc<MockProfileStore>, UserDirectory, Uuid) {
        let store = Arc::new(MockProfileStore::new());
        let id = Uuid::new_v4();
        store.seed(UserProfile::for_account(
            id,
            &NewUser {
                email: "ana@taller.com".to_string(),
                password: SecretString::new("secreto123".to_string()),
                nombre: "Ana".to_string(),
                rol: Role::Tecnico,
                sede: Some("Centro".to_string()),
            },
        ));
        (store.clone(), UserDirectory::new(store), id)
    }

    #[tokio::test]
    async fn get_unknown_user_is_not_found() {
        let (_, directory, _) = seeded();
        let err = directory.get_user(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::UserNotFound));
    }

    #[tokio::test]
    async fn update_changes_only_present_fields() {
        let (store, directory, id) = seeded();

        let updated = directory
            .update_user(
                id,
                UpdateUserRequest {
                    rol: Some("admin".to_string()),
                    sede: Some("  ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.rol, Role::Admin);
        assert_eq!(updated.sede, None);
        assert_eq!(updated.nombre, "Ana");
        assert_eq!(store.get(id), Some(updated));
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let (_, directory, id) = seeded();
        let err = directory
            .update_user(id, UpdateUserRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn invalid_role_in_update_is_a_validation_error() {
        let (_, directory, id) = seeded();
        let err = directory
            .update_user(
                id,
                UpdateUserRequest {
                    rol: Some("jefe".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn update_of_missing_user_is_not_found() {
        let (_, directory, _) = seeded();
        let err = directory
            .update_user(
                Uuid::new_v4(),
                UpdateUserRequest {
                    activo: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UserNotFound));
    }
}
