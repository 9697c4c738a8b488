use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::locations::location_name;
use crate::models::{LoginRequest, LoginResponse};

/// Check a login request, returning the location's display name.
pub fn validate_login(req: &LoginRequest) -> Result<&'static str, ValidationError> {
    if req.username.trim().is_empty() {
        return Err(ValidationError::MissingField("username"));
    }
    if req.location.trim().is_empty() {
        return Err(ValidationError::MissingField("location"));
    }
    location_name(&req.location)
        .ok_or_else(|| ValidationError::UnknownLocation(req.location.clone()))
}

/// POST /api/login - Issue an opaque session token.
///
/// The server keeps no session record; the token only proves the client
/// passed validation.
pub async fn login(Json(req): Json<LoginRequest>) -> Response {
    let location_name = match validate_login(&req) {
        Ok(name) => name,
        Err(e) => {
            tracing::debug!("Rejected login: {}", e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    tracing::info!("User {} signed in at {}", req.username.trim(), location_name);

    Json(LoginResponse {
        token: Uuid::new_v4().to_string(),
        username: req.username.trim().to_string(),
        location: req.location.trim().to_string(),
        location_name: location_name.to_string(),
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(username: &str, location: &str) -> LoginRequest {
        LoginRequest {
            username: username.to_string(),
            location: location.to_string(),
        }
    }

    #[test]
    fn test_validate_login() {
        assert_eq!(
            validate_login(&req("asha", "downtown")),
            Ok("Downtown Station Area")
        );
        assert_eq!(
            validate_login(&req("  ", "downtown")),
            Err(ValidationError::MissingField("username"))
        );
        assert_eq!(
            validate_login(&req("asha", "")),
            Err(ValidationError::MissingField("location"))
        );
        assert_eq!(
            validate_login(&req("asha", "moon")),
            Err(ValidationError::UnknownLocation("moon".to_string()))
        );
    }
}
