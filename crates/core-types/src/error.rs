use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The caller may not act on owned data (e.g. the account is still pending).
    #[error("Caller is not authorized")]
    Unauthorized,

    /// The caller is authenticated but lacks the administrative role.
    #[error("Administrative role required")]
    Forbidden,
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }
}
