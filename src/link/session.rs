//! Duplex session for reading button bytes while the link keeps writing

use futures::FutureExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;
use tracing::debug;

use super::port::BoxedReader;
use crate::{LcdError, Result};

/// Read side of a [`DeviceLink`](super::DeviceLink).
///
/// A session owns only a read half; dropping it never closes the link.
pub struct Session {
    path: PathBuf,
    reader: Mutex<BoxedReader>,
}

impl Session {
    pub(crate) fn new(path: PathBuf, reader: BoxedReader) -> Self {
        debug!("Session opened on {}", path.display());
        Self {
            path,
            reader: Mutex::new(reader),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read whatever is available into `buf`. Zero means nothing arrived
    /// within the port's read timeout.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut reader = self.reader.lock().await;
        reader.read(buf).await.map_err(|source| LcdError::Read { source })
    }

    /// Read without waiting. `Ok(None)` when another reader holds the session
    /// or no bytes are ready.
    pub fn try_read(&self, buf: &mut [u8]) -> Result<Option<usize>> {
        let Ok(mut reader) = self.reader.try_lock() else {
            return Ok(None);
        };
        match reader.read(buf).now_or_never() {
            Some(Ok(0)) | None => Ok(None),
            Some(Ok(n)) => Ok(Some(n)),
            Some(Err(source)) => Err(LcdError::Read { source }),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("path", &self.path).finish_non_exhaustive()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!("Session on {} closed", self.path.display());
    }
}
