use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{normalize_email, normalize_sede, NewUser, ProfileChanges, Role, UserProfile};
use crate::services::ServiceError;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(custom(function = "crate::utils::validation::validate_email_shape"))]
    #[schema(example = "tecnico@taller.com")]
    pub email: String,

    #[validate(length(min = 6, message = "La contraseña debe tener al menos 6 caracteres"))]
    #[schema(example = "secreto123", min_length = 6)]
    pub password: String,

    #[serde(alias = "name")]
    #[validate(custom(function = "crate::utils::validation::validate_not_blank"))]
    #[schema(example = "Ana Pérez")]
    pub nombre: String,

    #[serde(alias = "role")]
    #[validate(custom(function = "crate::utils::validation::validate_role"))]
    #[schema(example = "tecnico")]
    pub rol: String,

    #[serde(default, alias = "site")]
    #[schema(example = "Sede Centro")]
    pub sede: Option<String>,
}

impl CreateUserRequest {
    /// Normalises a request that already passed validation.
    pub fn into_new_user(self) -> Result<NewUser, ServiceError> {
        let rol: Role = self
            .rol
            .parse()
            .map_err(|e: crate::models::UnknownRole| ServiceError::InvalidInput(e.to_string()))?;

        Ok(NewUser {
            email: normalize_email(&self.email),
            password: SecretString::new(self.password),
            nombre: self.nombre.trim().to_string(),
            rol,
            sede: normalize_sede(self.sede.as_deref()),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateUserResponse {
    pub success: bool,
    #[schema(example = "Usuario creado exitosamente")]
    pub message: String,
    pub usuario: UserProfile,
}

/// Partial profile update. An empty `sede` clears the site.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(custom(function = "crate::utils::validation::validate_email_shape"))]
    pub email: Option<String>,

    #[serde(alias = "name")]
    #[validate(custom(function = "crate::utils::validation::validate_not_blank"))]
    pub nombre: Option<String>,

    #[serde(alias = "role")]
    #[validate(custom(function = "crate::utils::validation::validate_role"))]
    pub rol: Option<String>,

    #[serde(alias = "site")]
    pub sede: Option<String>,

    pub activo: Option<bool>,
}

impl UpdateUserRequest {
    pub fn into_changes(self) -> Result<ProfileChanges, ServiceError> {
        let rol = self
            .rol
            .map(|r| r.parse::<Role>())
            .transpose()
            .map_err(|e| ServiceError::InvalidInput(e.to_string()))?;

        Ok(ProfileChanges {
            email: self.email.as_deref().map(normalize_email),
            nombre: self.nombre.map(|n| n.trim().to_string()),
            rol,
            sede: self.sede.map(|s| normalize_sede(Some(&s))),
            activo: self.activo,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub success: bool,
    pub usuario: UserProfile,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub success: bool,
    pub usuarios: Vec<UserProfile>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteUserResponse {
    pub success: bool,
    #[schema(example = "Usuario eliminado exitosamente")]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn request() -> CreateUserRequest {
        CreateUserRequest {
            email: "  Tecnico@Taller.COM ".to_string(),
            password: "secreto123".to_string(),
            nombre: "  Ana Pérez ".to_string(),
            rol: "tecnico".to_string(),
            sede: Some("   ".to_string()),
        }
    }

    #[test]
    fn valid_request_passes_validation() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn short_password_names_the_field() {
        let req = CreateUserRequest {
            password: "12345".to_string(),
            ..request()
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
        assert_eq!(errors.field_errors().len(), 1);
    }

    #[test]
    fn every_bad_field_is_reported() {
        let req = CreateUserRequest {
            email: "not-an-email".to_string(),
            password: "1".to_string(),
            nombre: " ".to_string(),
            rol: "cliente".to_string(),
            sede: None,
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        for field in ["email", "password", "nombre", "rol"] {
            assert!(fields.contains_key(field), "missing {field}");
        }
    }

    #[test]
    fn accepts_english_aliases() {
        let req: CreateUserRequest = serde_json::from_str(
            r#"{"email":"a@b.com","password":"123456","name":"X","role":"admin","site":"Norte"}"#,
        )
        .unwrap();
        assert_eq!(req.nombre, "X");
        assert_eq!(req.rol, "admin");
        assert_eq!(req.sede.as_deref(), Some("Norte"));
    }

    #[test]
    fn new_user_is_normalised() {
        let user = request().into_new_user().unwrap();
        assert_eq!(user.email, "tecnico@taller.com");
        assert_eq!(user.nombre, "Ana Pérez");
        assert_eq!(user.rol, Role::Tecnico);
        assert_eq!(user.sede, None);
        assert_eq!(user.password.expose_secret(), "secreto123");
    }

    #[test]
    fn update_maps_empty_sede_to_clear() {
        let changes = UpdateUserRequest {
            sede: Some(String::new()),
            rol: Some("super-admin".to_string()),
            ..Default::default()
        }
        .into_changes()
        .unwrap();

        assert_eq!(changes.sede, Some(None));
        assert_eq!(changes.rol, Some(Role::SuperAdmin));
        assert_eq!(changes.email, None);
    }
}
