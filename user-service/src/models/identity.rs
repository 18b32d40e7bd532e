//! Identity account model - the credential-holding half of a user, owned by
//! the external identity provider.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::user::{NewUser, Role};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct IdentityAccount {
    pub id: Uuid,
    pub email: String,
    pub email_confirmed: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// Request to create an identity account. The password is write-only.
#[derive(Debug)]
pub struct NewIdentityAccount {
    pub email: String,
    pub password: SecretString,
    pub email_confirmed: bool,
    pub nombre: String,
    pub rol: Role,
}

impl From<&NewUser> for NewIdentityAccount {
    fn from(user: &NewUser) -> Self {
        Self {
            email: user.email.clone(),
            password: user.password.clone(),
            email_confirmed: true,
            nombre: user.nombre.clone(),
            rol: user.rol,
        }
    }
}
