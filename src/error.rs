// Crate-wide error type. Every variant states *where* things went wrong.
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::capture::CaptureError;

#[derive(Debug, Error)]
pub enum Error {
    /// Rejected at startup; never raised from inside the tick loop.
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Could not read config file {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Window init error: {0}")]
    WindowInit(String),

    #[error("Window update error: {0}")]
    WindowUpdate(String),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    // Malformed buffer dimensions handed to the compositor.
    #[error("Composite error: {0}")]
    Composite(String),

    #[error("Gaze input error: {0}")]
    Input(#[from] io::Error),
}
