use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why a program image could not be loaded. A failed load never touches the
/// instruction store that is currently installed.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("could not read program image {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unrecognised program image format {path:?}, expected a .bin or .hack file")]
    UnsupportedFormat { path: PathBuf },
}
