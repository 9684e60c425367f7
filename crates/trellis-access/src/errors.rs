use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("invalid action: {0}")]
    InvalidAction(String),
    #[error("department lookup failed: {0}")]
    DepartmentLookup(String),
}

pub type AccessResult<T> = Result<T, AccessError>;
