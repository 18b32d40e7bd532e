use axum::{
    extract::{Query, State},
    Json,
};
use service_core::error::AppError;

use crate::dtos::admin::{ReconcileQuery, ReconciliationReport};
use crate::dtos::ErrorResponse;
use crate::AppState;

/// Align profile ids with identity account ids
///
/// Matches by normalised email. With `dry_run=true` nothing is written.
#[utoipa::path(
    post,
    path = "/api/admin/reconcile",
    params(ReconcileQuery),
    responses(
        (status = 200, description = "Reconciliation report", body = ReconciliationReport),
        (status = 401, description = "Missing or invalid admin API key", body = ErrorResponse),
        (status = 500, description = "Configuration or backend failure", body = ErrorResponse)
    ),
    security(("admin_api_key" = [])),
    tag = "Admin"
)]
pub async fn reconcile(
    State(state): State<AppState>,
    Query(query): Query<ReconcileQuery>,
) -> Result<Json<ReconciliationReport>, AppError> {
    let report = state.reconciler()?.reconcile(query.dry_run).await?;
    Ok(Json(report))
}
