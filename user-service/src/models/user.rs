//! User profile model - the application-visible half of a user.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Roles a shop user can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    #[serde(rename = "tecnico")]
    Tecnico,
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "super-admin")]
    SuperAdmin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Tecnico, Role::Admin, Role::SuperAdmin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Tecnico => "tecnico",
            Role::Admin => "admin",
            Role::SuperAdmin => "super-admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Row of the `usuarios` table. `id` is always the identity account id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    #[schema(example = "tecnico@taller.com")]
    pub email: String,
    #[schema(example = "Ana Pérez")]
    pub nombre: String,
    #[sqlx(try_from = "String")]
    pub rol: Role,
    #[schema(example = "Sede Centro")]
    pub sede: Option<String>,
    pub activo: bool,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Profile for a freshly created identity account.
    pub fn for_account(account_id: Uuid, user: &NewUser) -> Self {
        Self {
            id: account_id,
            email: user.email.clone(),
            nombre: user.nombre.clone(),
            rol: user.rol,
            sede: user.sede.clone(),
            activo: true,
            created_at: Utc::now(),
        }
    }

    /// Applies a partial update in memory.
    pub fn apply(&mut self, changes: &ProfileChanges) {
        if let Some(email) = &changes.email {
            self.email = email.clone();
        }
        if let Some(nombre) = &changes.nombre {
            self.nombre = nombre.clone();
        }
        if let Some(rol) = changes.rol {
            self.rol = rol;
        }
        if let Some(sede) = &changes.sede {
            self.sede = sede.clone();
        }
        if let Some(activo) = changes.activo {
            self.activo = activo;
        }
    }
}

/// Validated, normalised input for creating a user.
#[derive(Debug)]
pub struct NewUser {
    pub email: String,
    pub password: SecretString,
    pub nombre: String,
    pub rol: Role,
    pub sede: Option<String>,
}

/// Partial update of a profile. `sede: Some(None)` clears the site.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub nombre: Option<String>,
    pub rol: Option<Role>,
    pub sede: Option<Option<String>>,
    pub activo: Option<bool>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        *self == ProfileChanges::default()
    }
}

/// Lowercased, trimmed email used for storage and matching.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trimmed site label; blank labels become `None`.
pub fn normalize_sede(sede: Option<&str>) -> Option<String> {
    sede.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_wire_names() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!(
            serde_json::to_string(&Role::SuperAdmin).unwrap(),
            "\"super-admin\""
        );
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!("cliente".parse::<Role>().is_err());
        assert!("Admin".parse::<Role>().is_err());
    }

    #[test]
    fn apply_only_touches_present_fields() {
        let mut profile = UserProfile {
            id: Uuid::new_v4(),
            email: "a@b.com".to_string(),
            nombre: "Ana".to_string(),
            rol: Role::Tecnico,
            sede: Some("Centro".to_string()),
            activo: true,
            created_at: Utc::now(),
        };

        profile.apply(&ProfileChanges {
            rol: Some(Role::Admin),
            sede: Some(None),
            ..Default::default()
        });

        assert_eq!(profile.rol, Role::Admin);
        assert_eq!(profile.sede, None);
        assert_eq!(profile.nombre, "Ana");
        assert_eq!(profile.email, "a@b.com");
    }

    #[test]
    fn sede_blank_is_none() {
        assert_eq!(normalize_sede(Some("  ")), None);
        assert_eq!(normalize_sede(Some(" Norte ")), Some("Norte".to_string()));
        assert_eq!(normalize_sede(None), None);
    }
}
