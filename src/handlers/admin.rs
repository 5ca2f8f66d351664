//! Admin endpoints.
//!
//! - POST /v1/admin/keys/generate - mint an API key for an account

use axum::{Json, extract::State};

use crate::{
    error::AppError,
    models::api_key::{GenerateKeyRequest, GenerateKeyResponse},
    services::credential_service,
    state::AppState,
};

/// Mint a new API key.
///
/// # Authentication
///
/// `X-Admin-Token` header when `ADMIN_TOKEN` is configured.
///
/// # Request Body
///
/// ```json
/// { "account_id": "acct_42", "name": "Front desk scanner" }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: the plaintext key (shown once), its id and prefix
/// - **Error (400)**: blank `account_id` or `name`
/// - **Error (401)**: wrong admin token
/// - **Error (500)**: database error
pub async fn generate_key(
    State(state): State<AppState>,
    Json(request): Json<GenerateKeyRequest>,
) -> Result<Json<GenerateKeyResponse>, AppError> {
    let response = credential_service::issue_key(&state.keys, request).await?;
    Ok(Json(response))
}
