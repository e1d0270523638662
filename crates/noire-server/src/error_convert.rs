use noire_types::AppError;
use sqlx::error::ErrorKind;

/// Convert a sqlx::Error into an AppError.
pub fn sqlx_to_app_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::RowNotFound => AppError::not_found("Resource not found"),
        sqlx::Error::Database(db_err) => {
            // SQLite reports e.g. "UNIQUE constraint failed: users.email"
            let detail = db_err.message();
            match db_err.kind() {
                ErrorKind::UniqueViolation => {
                    let friendly = if detail.contains("users.email") {
                        "An account with this email already exists"
                    } else if detail.contains("users.username") {
                        "This username is already taken"
                    } else if detail.contains("case_complainants") {
                        "You are already a complainant on this case"
                    } else if detail.contains("suspects.case_id") {
                        "This person is already a suspect in this case"
                    } else if detail.contains("board_connections") {
                        "These board items are already connected"
                    } else if detail.contains("captain_decisions") {
                        "A decision has already been recorded for this interrogation"
                    } else if detail.contains("trials") {
                        "A trial already exists for this decision"
                    } else {
                        "A record with this value already exists"
                    };
                    AppError::conflict(friendly)
                }
                ErrorKind::ForeignKeyViolation => {
                    AppError::bad_request("A referenced record does not exist")
                }
                ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                    AppError::bad_request(format!("The record violates a data constraint: {detail}"))
                }
                _ => AppError::database(err.to_string()),
            }
        }
        _ => AppError::database(err.to_string()),
    }
}

/// Extension trait providing `.into_app_error()` on sqlx::Error.
pub trait SqlxErrorExt {
    fn into_app_error(self) -> AppError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_app_error(self) -> AppError {
        sqlx_to_app_error(self)
    }
}

/// Trait for validating request DTOs before processing.
pub trait ValidateRequest {
    fn validate_request(&self) -> Result<(), AppError>;
}

impl<T: validator::Validate> ValidateRequest for T {
    fn validate_request(&self) -> Result<(), AppError> {
        self.validate().map_err(AppError::from)
    }
}
