//! Repairs drift between identity accounts and profiles.
//!
//! The identity account id is authoritative. Pairs are matched by
//! normalised email equality only; anything that cannot be matched
//! unambiguously is reported and left alone.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use super::identity::IdentityProvider;
use super::profiles::ProfileStore;
use super::ServiceError;
use crate::dtos::admin::{DriftKind, ReconcileAction, ReconciliationEntry, ReconciliationReport};
use crate::models::{normalize_email, IdentityAccount, UserProfile};

#[derive(Clone)]
pub struct Reconciler {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
}

impl Reconciler {
    pub fn new(identity: Arc<dyn IdentityProvider>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { identity, profiles }
    }

    pub async fn reconcile(&self, dry_run: bool) -> Result<ReconciliationReport, ServiceError> {
        let accounts = self.identity.list_accounts().await?;
        let profiles = self.profiles.list_profiles().await?;

        let account_ids: HashSet<Uuid> = accounts.iter().map(|a| a.id).collect();
        let mut by_email: HashMap<String, Vec<&IdentityAccount>> = HashMap::new();
        for account in &accounts {
            by_email
                .entry(normalize_email(&account.email))
                .or_default()
                .push(account);
        }

        let mut report = ReconciliationReport {
            dry_run,
            identity_accounts: accounts.len(),
            profiles: profiles.len(),
            ..Default::default()
        };

        // Identity ids held by some profile, including ones about to be adopted.
        let mut claimed: HashSet<Uuid> = HashSet::new();
        let mut drifted: Vec<&UserProfile> = Vec::new();
        for profile in &profiles {
            if account_ids.contains(&profile.id) {
                report.in_sync += 1;
                claimed.insert(profile.id);
            } else {
                drifted.push(profile);
            }
        }

        for profile in drifted {
            let email = normalize_email(&profile.email);
            let matches = by_email.get(&email).map(Vec::as_slice).unwrap_or_default();

            let entry = match matches {
                [] => entry(
                    DriftKind::OrphanProfile,
                    ReconcileAction::ReportOnly,
                    &email,
                    Some(profile.id),
                    None,
                ),
                [account] if claimed.contains(&account.id) => {
                    tracing::warn!(
                        profile_id = %profile.id,
                        identity_id = %account.id,
                        "Identity id already used by another profile"
                    );
                    entry(
                        DriftKind::Conflict,
                        ReconcileAction::ReportOnly,
                        &email,
                        Some(profile.id),
                        Some(account.id),
                    )
                }
                [account] => {
                    claimed.insert(account.id);
                    self.reassign(profile.id, account.id, &email, dry_run, &mut report)
                        .await
                }
                _ => {
                    tracing::warn!(
                        profile_id = %profile.id,
                        email = %email,
                        "Several identity accounts share this email"
                    );
                    entry(
                        DriftKind::Ambiguous,
                        ReconcileAction::ReportOnly,
                        &email,
                        Some(profile.id),
                        None,
                    )
                }
            };
            report.entries.push(entry);
        }

        for account in &accounts {
            if !claimed.contains(&account.id) {
                report.entries.push(entry(
                    DriftKind::OrphanIdentity,
                    ReconcileAction::ReportOnly,
                    &normalize_email(&account.email),
                    None,
                    Some(account.id),
                ));
            }
        }

        tracing::info!(
            dry_run,
            identity_accounts = report.identity_accounts,
            profiles = report.profiles,
            in_sync = report.in_sync,
            reassigned = report.reassigned,
            drift = report.entries.len(),
            "Reconciliation finished"
        );
        Ok(report)
    }

    async fn reassign(
        &self,
        from: Uuid,
        to: Uuid,
        email: &str,
        dry_run: bool,
        report: &mut ReconciliationReport,
    ) -> ReconciliationEntry {
        if dry_run {
            return entry(
                DriftKind::StaleId,
                ReconcileAction::WouldReassign,
                email,
                Some(from),
                Some(to),
            );
        }

        match self.profiles.reassign_profile_id(from, to).await {
            Ok(()) => {
                tracing::info!(
                    from = %from,
                    to = %to,
                    "Profile id reassigned to identity account"
                );
                report.reassigned += 1;
                entry(
                    DriftKind::StaleId,
                    ReconcileAction::Reassigned,
                    email,
                    Some(from),
                    Some(to),
                )
            }
            Err(e) => {
                tracing::error!(
                    from = %from,
                    to = %to,
                    error = %e,
                    "Profile id reassignment failed"
                );
                ReconciliationEntry {
                    error: Some(e.to_string()),
                    ..entry(
                        DriftKind::StaleId,
                        ReconcileAction::Failed,
                        email,
                        Some(from),
                        Some(to),
                    )
                }
            }
        }
    }
}

fn entry(
    kind: DriftKind,
    action: ReconcileAction,
    email: &str,
    profile_id: Option<Uuid>,
    identity_id: Option<Uuid>,
) -> ReconciliationEntry {
    ReconciliationEntry {
        kind,
        action,
        email: email.to_string(),
        profile_id,
        identity_id,
        error: None,
    }
}
