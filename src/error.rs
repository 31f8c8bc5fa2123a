use datafusion::{arrow::error::ArrowError, error::DataFusionError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("DataFusion: {0}")]
    DataFusion(#[from] DataFusionError),

    #[error("Arrow: {0}")]
    Arrow(#[from] ArrowError),

    #[error("Excel: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("The start date: '{start_date}' is greater than the end date: '{end_date}'")]
    StartDateAfterEndDate {
        start_date: String,
        end_date: String,
    },

    #[error("API call failed with status {status}: {body}")]
    ApiFailure { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected report payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Failed to parse URL: {0}")]
    UrlParsingFailed(#[from] url::ParseError),

    #[error("Cannot load certificate file {}: {source}", path.display())]
    Certificate {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("{message}")]
    NoData { message: String },
}
