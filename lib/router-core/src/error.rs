use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("missing root path on host {hostname}")]
    MissingRootPath { hostname: String },

    #[error("failed to write map {}: {source}", path.display())]
    WriteMap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
