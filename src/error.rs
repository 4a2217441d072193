use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised by the factorization engine. None of them are retryable: the same inputs
/// always fail the same way.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Cannot raise to negative exponent {0}")]
    InvalidExponent(i64),

    #[error("Cannot pull root {root} of {value}")]
    InvalidRoot { root: i32, value: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Not a non-negative decimal integer: {0}")]
    Parse(String),
}
