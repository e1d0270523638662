use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Categorization of application errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum AppErrorKind {
    NotFound,
    BadRequest,
    ValidationError,
    Conflict,
    DatabaseError,
    Unauthorized,
    Forbidden,
    InternalError,
}

impl fmt::Display for AppErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppErrorKind::NotFound => write!(f, "NotFound"),
            AppErrorKind::BadRequest => write!(f, "BadRequest"),
            AppErrorKind::ValidationError => write!(f, "ValidationError"),
            AppErrorKind::Conflict => write!(f, "Conflict"),
            AppErrorKind::DatabaseError => write!(f, "DatabaseError"),
            AppErrorKind::Unauthorized => write!(f, "Unauthorized"),
            AppErrorKind::Forbidden => write!(f, "Forbidden"),
            AppErrorKind::InternalError => write!(f, "InternalError"),
        }
    }
}

/// Structured application error, serialized identically by every endpoint.
///
/// The human-readable text travels in `error`. Cross-field problems go to
/// `non_field_errors` so they are never pinned on a single field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AppError {
    pub kind: AppErrorKind,
    #[serde(rename = "error")]
    pub message: String,
    /// Machine-readable reason, e.g. `invalid_status` or `higher_rank_required`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub field_errors: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub non_field_errors: Vec<String>,
}

impl AppError {
    fn new(kind: AppErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            field_errors: HashMap::new(),
            non_field_errors: Vec::new(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::BadRequest, message)
    }

    pub fn validation(message: impl Into<String>, field_errors: HashMap<String, String>) -> Self {
        Self {
            field_errors,
            ..Self::new(AppErrorKind::ValidationError, message)
        }
    }

    /// A single error against one named field.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut field_errors = HashMap::new();
        field_errors.insert(field.into(), message.clone());
        Self::validation(message, field_errors)
    }

    /// A cross-field constraint violation that belongs to no single field.
    pub fn non_field(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            non_field_errors: vec![message.clone()],
            ..Self::new(AppErrorKind::ValidationError, message)
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Conflict, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::DatabaseError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::InternalError, message)
    }

    /// Attach a machine-readable reason code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[cfg_attr(not(feature = "server"), allow(dead_code))]
    fn status_code_u16(&self) -> u16 {
        match self.kind {
            AppErrorKind::NotFound => 404,
            AppErrorKind::BadRequest => 400,
            AppErrorKind::ValidationError => 422,
            AppErrorKind::Conflict => 409,
            AppErrorKind::DatabaseError => 500,
            AppErrorKind::Unauthorized => 401,
            AppErrorKind::Forbidden => 403,
            AppErrorKind::InternalError => 500,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for AppError {}

#[cfg(feature = "validation")]
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut field_errors = HashMap::new();
        let mut non_field_errors = Vec::new();
        for (field, errs) in errors.field_errors() {
            if let Some(first) = errs.first() {
                let msg = first
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                // Struct-level (schema) validators report under `__all__`.
                if field == "__all__" {
                    non_field_errors.push(msg);
                } else {
                    field_errors.insert(field.to_string(), msg);
                }
            }
        }
        let mut err = AppError::validation("Validation failed", field_errors);
        err.non_field_errors = non_field_errors;
        err
    }
}

#[cfg(feature = "server")]
impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = axum::http::StatusCode::from_u16(self.status_code_u16())
            .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        (status, axum::Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_error_has_correct_kind() {
        let err = AppError::not_found("missing item");
        assert_eq!(err.kind, AppErrorKind::NotFound);
        assert_eq!(err.message, "missing item");
        assert!(err.field_errors.is_empty());
        assert!(err.code.is_none());
    }

    #[test]
    fn message_serializes_under_error_key() {
        let err = AppError::forbidden("A higher-ranking officer is required")
            .with_code("higher_rank_required");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["error"], "A higher-ranking officer is required");
        assert_eq!(json["code"], "higher_rank_required");
        assert_eq!(json["kind"], "Forbidden");
        assert!(json.get("message").is_none());
        assert!(json.get("field_errors").is_none());
        assert!(json.get("non_field_errors").is_none());
    }

    #[test]
    fn field_error_is_keyed_by_field() {
        let err = AppError::field("rejection_reason", "A rejection reason is required");
        assert_eq!(err.kind, AppErrorKind::ValidationError);
        assert_eq!(
            err.field_errors.get("rejection_reason").unwrap(),
            "A rejection reason is required"
        );
        assert!(err.non_field_errors.is_empty());
    }

    #[test]
    fn non_field_error_uses_its_own_channel() {
        let err = AppError::non_field("Provide either a license plate or a serial number");
        assert!(err.field_errors.is_empty());
        assert_eq!(err.non_field_errors.len(), 1);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(
            json["non_field_errors"][0],
            "Provide either a license plate or a serial number"
        );
    }

    #[test]
    fn status_code_mapping() {
        assert_eq!(AppError::not_found("").status_code_u16(), 404);
        assert_eq!(AppError::bad_request("").status_code_u16(), 400);
        assert_eq!(
            AppError::validation("", HashMap::new()).status_code_u16(),
            422
        );
        assert_eq!(AppError::conflict("").status_code_u16(), 409);
        assert_eq!(AppError::database("").status_code_u16(), 500);
        assert_eq!(AppError::unauthorized("").status_code_u16(), 401);
        assert_eq!(AppError::forbidden("").status_code_u16(), 403);
        assert_eq!(AppError::internal("").status_code_u16(), 500);
    }

    #[test]
    fn display_impl_formats_correctly() {
        let err = AppError::unauthorized("bad credentials");
        assert_eq!(format!("{}", err), "Unauthorized: bad credentials");
    }

    #[test]
    fn error_parses_back_from_wire_shape() {
        let json = r#"{"kind":"BadRequest","error":"Case is not joinable","code":"not_joinable"}"#;
        let err: AppError = serde_json::from_str(json).unwrap();
        assert_eq!(err.kind, AppErrorKind::BadRequest);
        assert_eq!(err.code.as_deref(), Some("not_joinable"));
        assert!(err.non_field_errors.is_empty());
    }
}
