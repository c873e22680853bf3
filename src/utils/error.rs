use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    ConfigFileError(#[from] toml::de::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("PDF extraction failed: {0}")]
    PdfError(#[from] pdf_extract::OutputError),

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Stage '{stage}' failed: {details}")]
    StageError { stage: String, details: String },

    #[error("{provider} model error: {message}")]
    LlmError { provider: String, message: String },

    #[error("Manifest line {line}: {message}")]
    ManifestError { line: usize, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

pub type Result<T> = std::result::Result<T, FlowError>;
