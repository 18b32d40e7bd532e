use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReconcileQuery {
    /// Compute the report without writing anything.
    #[serde(default)]
    pub dry_run: bool,
}

/// How an identity/profile pair relates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DriftKind {
    /// Profile id differs from the identity account with the same email.
    StaleId,
    /// The identity id that would be adopted already belongs to another profile.
    Conflict,
    /// More than one identity account shares the profile's email.
    Ambiguous,
    /// Profile with no identity account.
    OrphanProfile,
    /// Identity account with no profile.
    OrphanIdentity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileAction {
    ReportOnly,
    WouldReassign,
    Reassigned,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReconciliationEntry {
    pub kind: DriftKind,
    pub action: ReconcileAction,
    pub email: String,
    pub profile_id: Option<Uuid>,
    pub identity_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ReconciliationReport {
    pub dry_run: bool,
    pub identity_accounts: usize,
    pub profiles: usize,
    pub in_sync: usize,
    pub reassigned: usize,
    pub entries: Vec<ReconciliationEntry>,
}

impl ReconciliationReport {
    pub fn count(&self, kind: DriftKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }
}
