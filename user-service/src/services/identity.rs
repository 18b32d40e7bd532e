//! Identity provider admin client.
//!
//! The identity provider owns credentials and assigns account ids. This
//! service only needs its admin surface: create a pre-confirmed account,
//! delete an account, and enumerate accounts for reconciliation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use service_core::observability::trace_context::outbound_headers;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

use super::locked;
use crate::models::{normalize_email, IdentityAccount, NewIdentityAccount};

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("A user with this email address has already been registered")]
    EmailTaken,

    #[error("Identity account not found")]
    NotFound,

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Identity provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected identity provider response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_account(
        &self,
        account: &NewIdentityAccount,
    ) -> Result<IdentityAccount, IdentityError>;

    async fn delete_account(&self, id: Uuid) -> Result<(), IdentityError>;

    async fn find_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<IdentityAccount>, IdentityError>;

    async fn list_accounts(&self) -> Result<Vec<IdentityAccount>, IdentityError>;
}

/// Client for the hosted auth admin REST API (`/auth/v1/admin/users`).
#[derive(Clone)]
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    service_role_key: SecretString,
    page_size: u32,
}

#[derive(Serialize)]
struct CreateUserBody<'a> {
    email: &'a str,
    password: &'a str,
    email_confirm: bool,
    user_metadata: UserMetadata<'a>,
}

#[derive(Serialize)]
struct UserMetadata<'a> {
    nombre: &'a str,
    rol: &'a str,
}

#[derive(Deserialize)]
struct AdminUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl From<AdminUser> for IdentityAccount {
    fn from(user: AdminUser) -> Self {
        Self {
            id: user.id,
            email: user.email.unwrap_or_default(),
            email_confirmed: user.email_confirmed_at.is_some(),
            created_at: user.created_at,
        }
    }
}

#[derive(Deserialize)]
struct UserPage {
    #[serde(default)]
    users: Vec<AdminUser>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorPayload {
    error_code: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl ErrorPayload {
    fn text(self) -> Option<String> {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
    }
}

/// Maps a non-success admin API response onto [`IdentityError`].
fn classify_error(status: StatusCode, body: &str) -> IdentityError {
    let payload: ErrorPayload = serde_json::from_str(body).unwrap_or_default();
    let code = payload.error_code.clone();

    if status == StatusCode::NOT_FOUND {
        return IdentityError::NotFound;
    }

    let message = payload
        .text()
        .unwrap_or_else(|| format!("Identity provider returned {}", status));
    let lowered = message.to_lowercase();

    let taken = matches!(code.as_deref(), Some("email_exists") | Some("user_already_exists"))
        || lowered.contains("already been registered")
        || lowered.contains("already registered");

    if taken {
        IdentityError::EmailTaken
    } else {
        IdentityError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

impl HttpIdentityProvider {
    pub fn new(
        base_url: &str,
        service_role_key: SecretString,
        page_size: u32,
    ) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("user-service/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_role_key,
            page_size: page_size.max(1),
        })
    }

    fn users_url(&self) -> String {
        format!("{}/auth/v1/admin/users", self.base_url)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let key = self.service_role_key.expose_secret();
        self.client
            .request(method, url)
            .headers(outbound_headers())
            .header("apikey", key)
            .bearer_auth(key)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, IdentityError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &body));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| IdentityError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn create_account(
        &self,
        account: &NewIdentityAccount,
    ) -> Result<IdentityAccount, IdentityError> {
        let body = CreateUserBody {
            email: &account.email,
            password: account.password.expose_secret(),
            email_confirm: account.email_confirmed,
            user_metadata: UserMetadata {
                nombre: &account.nombre,
                rol: account.rol.as_str(),
            },
        };

        let response = self
            .request(Method::POST, &self.users_url())
            .json(&body)
            .send()
            .await?;
        let user: AdminUser = Self::read_json(response).await?;

        Ok(user.into())
    }

    async fn delete_account(&self, id: Uuid) -> Result<(), IdentityError> {
        let url = format!("{}/{}", self.users_url(), id);
        let response = self.request(Method::DELETE, &url).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_error(status, &body))
    }

    async fn find_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<IdentityAccount>, IdentityError> {
        // The admin API has no email filter; scan the pages.
        let wanted = normalize_email(email);
        Ok(self
            .list_accounts()
            .await?
            .into_iter()
            .find(|a| normalize_email(&a.email) == wanted))
    }

    async fn list_accounts(&self) -> Result<Vec<IdentityAccount>, IdentityError> {
        let mut accounts = Vec::new();
        let mut page: u32 = 1;

        loop {
            let response = self
                .request(Method::GET, &self.users_url())
                .query(&[("page", page), ("per_page", self.page_size)])
                .send()
                .await?;
            let batch: UserPage = Self::read_json(response).await?;

            let fetched = batch.users.len();
            accounts.extend(batch.users.into_iter().map(IdentityAccount::from));

            if fetched < self.page_size as usize {
                break;
            }
            page += 1;
        }

        tracing::debug!(count = accounts.len(), "Listed identity accounts");
        Ok(accounts)
    }
}

/// In-memory identity provider with call counters and fault injection.
#[derive(Default)]
pub struct MockIdentityProvider {
    accounts: Mutex<Vec<IdentityAccount>>,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    create_failure: Mutex<Option<String>>,
    delete_failure: Mutex<Option<String>>,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an existing account without counting it as a create call.
    pub fn seed(&self, email: &str) -> IdentityAccount {
        self.seed_with_id(Uuid::new_v4(), email)
    }

    pub fn seed_with_id(&self, id: Uuid, email: &str) -> IdentityAccount {
        let account = IdentityAccount {
            id,
            email: normalize_email(email),
            email_confirmed: true,
            created_at: Some(Utc::now()),
        };
        locked(&self.accounts).push(account.clone());
        account
    }

    /// The next `create_account` call fails with `message`.
    pub fn fail_next_create(&self, message: &str) {
        *locked(&self.create_failure) = Some(message.to_string());
    }

    /// Every `delete_account` call fails with `message` from now on.
    pub fn fail_deletes(&self, message: &str) {
        *locked(&self.delete_failure) = Some(message.to_string());
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn account_count(&self) -> usize {
        locked(&self.accounts).len()
    }

    pub fn account_by_email(&self, email: &str) -> Option<IdentityAccount> {
        let wanted = normalize_email(email);
        locked(&self.accounts)
            .iter()
            .find(|a| a.email == wanted)
            .cloned()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn create_account(
        &self,
        account: &NewIdentityAccount,
    ) -> Result<IdentityAccount, IdentityError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = locked(&self.create_failure).take() {
            return Err(IdentityError::Rejected {
                status: 500,
                message,
            });
        }

        let email = normalize_email(&account.email);
        let mut accounts = locked(&self.accounts);
        if accounts.iter().any(|a| a.email == email) {
            return Err(IdentityError::EmailTaken);
        }

        let created = IdentityAccount {
            id: Uuid::new_v4(),
            email,
            email_confirmed: account.email_confirmed,
            created_at: Some(Utc::now()),
        };
        accounts.push(created.clone());
        Ok(created)
    }

    async fn delete_account(&self, id: Uuid) -> Result<(), IdentityError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = locked(&self.delete_failure).clone() {
            return Err(IdentityError::Rejected {
                status: 500,
                message,
            });
        }

        let mut accounts = locked(&self.accounts);
        let before = accounts.len();
        accounts.retain(|a| a.id != id);
        if accounts.len() == before {
            return Err(IdentityError::NotFound);
        }
        Ok(())
    }

    async fn find_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<IdentityAccount>, IdentityError> {
        Ok(self.account_by_email(email))
    }

    async fn list_accounts(&self) -> Result<Vec<IdentityAccount>, IdentityError> {
        Ok(locked(&self.accounts).clone())
    }
}
