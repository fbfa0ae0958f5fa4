//! File-drop plan source.
//!
//! Reads the OFP JSON document the dispatcher tool saves to disk.  A
//! missing file means no plan has been dispatched yet.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::app::ports::PlanSource;
use crate::error::FetchError;

pub struct FilePlanSource {
    path: PathBuf,
}

impl FilePlanSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PlanSource for FilePlanSource {
    fn fetch(&mut self) -> Result<Vec<u8>, FetchError> {
        fs::read(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => FetchError::Unavailable,
            ErrorKind::TimedOut | ErrorKind::WouldBlock => FetchError::Timeout,
            _ => FetchError::Io,
        })
    }
}
