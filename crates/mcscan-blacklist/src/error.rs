use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlacklistError {
    #[error("failed to read blacklist file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("blacklist file {path}, line {line}: invalid entry {entry:?}")]
    InvalidEntry {
        path: String,
        line: usize,
        entry: String,
    },
}
