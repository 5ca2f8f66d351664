//! Admin token middleware.
//!
//! Guards the key-issuance routes. Scan requests authenticate inside the
//! scan pipeline instead, because the region check has to run before the
//! key lookup.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};

use crate::{error::AppError, state::AppState};

/// Header carrying the admin token.
pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

/// Admin authentication middleware function.
///
/// # Flow
///
/// 1. No `ADMIN_TOKEN` configured: pass the request through
/// 2. Read the `X-Admin-Token` header
/// 3. Compare digests of the presented and configured tokens
/// 4. Mismatch or missing header: 401 `invalid_admin_token`
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let presented = request
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::InvalidAdminToken)?;

    // Fixed-length digests keep the comparison independent of token length.
    if Sha256::digest(presented.as_bytes()) != Sha256::digest(expected.as_bytes()) {
        tracing::warn!("rejected admin request with wrong token");
        return Err(AppError::InvalidAdminToken);
    }

    Ok(next.run(request).await)
}
