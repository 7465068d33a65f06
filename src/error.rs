use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Catalog error: {0}")]
    Config(String),

    #[error("Invalid price '{text}' for item {id}")]
    InvalidPrice { id: u32, text: String },

    #[error("Duplicate item id {0} in catalog")]
    DuplicateItem(u32),

    #[error("Invalid discount factor {factor} for code '{code}': must be in (0, 1]")]
    InvalidDiscount { code: String, factor: f64 },

    #[error("Invalid action '{0}'. Examples: inc:1, dec:2, remove:3, set:1=4, code:DESCUENTO10")]
    InvalidAction(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_ARGUMENTS: i32 = 2;
    pub const CATALOG_ERROR: i32 = 3;
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_)
            | Error::InvalidPrice { .. }
            | Error::DuplicateItem(_)
            | Error::InvalidDiscount { .. }
            | Error::Toml(_) => exit_code::CATALOG_ERROR,
            Error::InvalidAction(_) => exit_code::INVALID_ARGUMENTS,
            _ => exit_code::GENERAL_ERROR,
        }
    }
}
