use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::users::{
    CreateUserRequest, CreateUserResponse, DeleteUserResponse, UpdateUserRequest,
    UserListResponse, UserResponse,
};
use crate::dtos::ErrorResponse;
use crate::utils::ApiJson;
use crate::AppState;

fn parse_user_id(raw: &str) -> Result<Uuid, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(anyhow::anyhow!("ID de usuario inválido")))
}

/// Create a user: identity account plus profile, sharing one id
#[utoipa::path(
    post,
    path = "/api/usuarios",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = CreateUserResponse),
        (status = 400, description = "Validation error or malformed JSON", body = ErrorResponse),
        (status = 401, description = "Missing bearer token", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 500, description = "Configuration or backend failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Usuarios"
)]
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let provisioner = state.provisioner()?;
    let usuario = provisioner.create_user(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            success: true,
            message: "Usuario creado exitosamente".to_string(),
            usuario,
        }),
    ))
}

/// List profiles, oldest first
#[utoipa::path(
    get,
    path = "/api/usuarios",
    responses(
        (status = 200, description = "All profiles", body = UserListResponse),
        (status = 401, description = "Missing bearer token", body = ErrorResponse),
        (status = 500, description = "Database failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Usuarios"
)]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<UserListResponse>, AppError> {
    let usuarios = state.directory.list_users().await?;
    Ok(Json(UserListResponse {
        success: true,
        usuarios,
    }))
}

#[utoipa::path(
    get,
    path = "/api/usuarios/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Profile found", body = UserResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 401, description = "Missing bearer token", body = ErrorResponse),
        (status = 404, description = "No such user", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Usuarios"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let usuario = state.directory.get_user(parse_user_id(&id)?).await?;
    Ok(Json(UserResponse {
        success: true,
        usuario,
    }))
}

/// Partially update a profile. The identity account is not touched.
#[utoipa::path(
    patch,
    path = "/api/usuarios/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Validation error or empty update", body = ErrorResponse),
        (status = 401, description = "Missing bearer token", body = ErrorResponse),
        (status = 404, description = "No such user", body = ErrorResponse),
        (status = 500, description = "Database failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Usuarios"
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let usuario = state
        .directory
        .update_user(parse_user_id(&id)?, req)
        .await?;
    Ok(Json(UserResponse {
        success: true,
        usuario,
    }))
}

/// Delete the identity account, then the profile
#[utoipa::path(
    delete,
    path = "/api/usuarios/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = DeleteUserResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 401, description = "Missing bearer token", body = ErrorResponse),
        (status = 404, description = "No such user", body = ErrorResponse),
        (status = 500, description = "Configuration or backend failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Usuarios"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteUserResponse>, AppError> {
    let id = parse_user_id(&id)?;
    state.provisioner()?.delete_user(id).await?;
    Ok(Json(DeleteUserResponse {
        success: true,
        message: "Usuario eliminado exitosamente".to_string(),
    }))
}
