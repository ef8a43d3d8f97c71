use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DiscoError {
    #[error("failed to parse {source_name}: {reason}")]
    ParseError { source_name: String, reason: String },

    #[error("table '{table}' is missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("failed to load thresholds from {path}: {reason}")]
    ThresholdLoad { path: PathBuf, reason: String },

    #[error("invalid threshold configuration: {0}")]
    ThresholdInvalid(String),

    #[error("feeder '{feeder}' has no metric rows to evaluate")]
    NoMetricRows { feeder: String },

    #[error("no metric rows matched the requested filters")]
    NoMatches,

    #[error("no unit cost for {equipment}: {reason}")]
    UnitCostMissing { equipment: String, reason: String },

    #[error("analysis run failed: {0}")]
    AnalysisRun(String),

    #[error("output path {0} already exists. Pass --force to overwrite")]
    OutputExists(PathBuf),

    #[error("timed out waiting for lock {0}")]
    LockTimeout(PathBuf),

    #[error("failed to read workbook: {0}")]
    Workbook(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl DiscoError {
    pub(crate) fn parse(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        DiscoError::ParseError {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}
