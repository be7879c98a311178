use thiserror::Error;

#[derive(Error, Debug)]
pub enum CubikError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage Error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid solve time: {0}")]
    InvalidTime(f64),

    #[error("Configuration Error: {0}")]
    Config(String),
}

pub type CubikResult<T> = Result<T, CubikError>;
