use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CategorizerError {
    #[error("Invalid rule for {category}: {reason}")]
    InvalidRule { category: String, reason: String },

    #[error("Invalid configuration value for {name}: {value}")]
    InvalidConfig { name: String, value: String },
}

pub type CategorizerResult<T> = Result<T, CategorizerError>;
