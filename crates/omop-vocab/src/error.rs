use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum VocabError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("missing column `{column}` in {path}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("invalid value `{value}` for `{column}` in {path} at line {line}")]
    InvalidValue {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },

    #[error("required vocabulary file not found: {path}")]
    MissingFile { path: PathBuf },
}

impl VocabError {
    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}
