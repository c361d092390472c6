//! Serial device link: command encoding, write buffering and sessions.
//!
//! [`DeviceLink`] is the single point through which bytes reach the display.
//! Writes are appended to a pending buffer and each write is followed by the
//! fixed inter-command delay the hardware needs. Nothing reaches the wire until
//! [`DeviceLink::flush`], which pushes the whole buffer in one write. Image
//! uploads and LED changes flush immediately.
//!
//! ```rust,no_run
//! use ezio::link::DeviceLink;
//! use ezio::types::{Led, LedColor};
//!
//! # #[tokio::main]
//! # async fn main() -> ezio::Result<()> {
//! let mut link = DeviceLink::open("/dev/ttyS1")?;
//! link.init().await?;
//! link.set_backlight(200).await?;
//! link.set_led(Led::Middle, LedColor::Orange).await?;
//! link.close().await?;
//! # Ok(())
//! # }
//! ```

mod memory;
mod port;
mod session;

pub use memory::{MemoryPort, MemoryPortHandle};
pub use port::{BAUD_RATE, BoxedReader, SerialPort, open_port};
#[cfg(unix)]
pub use port::TtyPort;
pub use session::Session;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{Span, debug, info, info_span, trace, warn};

use crate::framebuffer::WireImage;
use crate::types::{Command, CursorDirection, Led, LedColor};
use crate::{LcdError, Result};

/// Pause applied after every buffered write.
pub const DEFAULT_COMMAND_DELAY: Duration = Duration::from_millis(1);

const PREVIEW_BYTES: usize = 20;

/// Diagnostic sink attached to a link at construction.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    span: Span,
    dump_payloads: bool,
}

impl Diagnostics {
    /// Diagnostics scoped to the port at `path`.
    pub fn for_port(path: &Path) -> Self {
        Self {
            span: info_span!("ezio_link", port = %path.display()),
            dump_payloads: false,
        }
    }

    /// Diagnostics that record nothing.
    pub fn disabled() -> Self {
        Self {
            span: Span::none(),
            dump_payloads: false,
        }
    }

    /// Log hex previews of buffered and flushed payloads at trace level.
    pub fn with_payload_dump(mut self, dump: bool) -> Self {
        self.dump_payloads = dump;
        self
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    fn payload(&self, what: &str, bytes: &[u8]) {
        if self.dump_payloads {
            trace!(parent: &self.span, "{} {} bytes: {}", what, bytes.len(), hex_preview(bytes));
        }
    }
}

/// Space-separated hex of the first bytes of `bytes`.
pub fn hex_preview(bytes: &[u8]) -> String {
    let shown = bytes
        .iter()
        .take(PREVIEW_BYTES)
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ");
    if bytes.len() > PREVIEW_BYTES {
        format!("{}... (truncated)", shown)
    } else {
        shown
    }
}

/// Construction options for a [`DeviceLink`].
#[derive(Debug, Clone)]
pub struct LinkOptions {
    pub command_delay: Duration,
    pub dump_payloads: bool,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            command_delay: DEFAULT_COMMAND_DELAY,
            dump_payloads: false,
        }
    }
}

/// Buffered, write-mostly link to the display.
pub struct DeviceLink {
    path: PathBuf,
    port: Option<Box<dyn SerialPort>>,
    pending: Vec<u8>,
    command_delay: Duration,
    diagnostics: Diagnostics,
    session: Weak<Session>,
}

impl DeviceLink {
    /// Open and configure the serial port at `path` with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, LinkOptions::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, options: LinkOptions) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening {} at {} baud", path.display(), BAUD_RATE);
        let port = open_port(path).map_err(|source| match source.kind() {
            std::io::ErrorKind::Unsupported => {
                LcdError::unsupported_platform("Serial ports", "Unix")
            }
            _ => LcdError::open_failed(path.to_path_buf(), source),
        })?;
        Ok(Self::from_port(path, port, options))
    }

    /// Wrap an already opened port.
    pub fn from_port<P: AsRef<Path>>(
        path: P,
        port: Box<dyn SerialPort>,
        options: LinkOptions,
    ) -> Self {
        let path = path.as_ref().to_path_buf();
        let diagnostics = Diagnostics::for_port(&path).with_payload_dump(options.dump_payloads);
        Self {
            path,
            port: Some(port),
            pending: Vec::new(),
            command_delay: options.command_delay,
            diagnostics,
            session: Weak::new(),
        }
    }

    /// In-memory link, returning the handle used to inspect traffic.
    pub fn memory(options: LinkOptions) -> (Self, MemoryPortHandle) {
        let (port, handle) = MemoryPort::new();
        (Self::from_port("memory", Box::new(port), options), handle)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// Bytes buffered but not yet flushed.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    pub fn command_delay(&self) -> Duration {
        self.command_delay
    }

    pub fn set_command_delay(&mut self, delay: Duration) {
        debug!(parent: self.diagnostics.span(), "Command delay set to {:?}", delay);
        self.command_delay = delay;
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn closed(&self) -> LcdError {
        LcdError::LinkClosed {
            path: self.path.clone(),
        }
    }

    /// Append `bytes` to the pending buffer and wait out the command delay.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.port.is_none() {
            return Err(self.closed());
        }
        self.diagnostics.payload("Buffer", bytes);
        self.pending.extend_from_slice(bytes);
        if !self.command_delay.is_zero() {
            tokio::time::sleep(self.command_delay).await;
        }
        Ok(())
    }

    /// Buffer one encoded command.
    pub async fn send(&mut self, command: &Command) -> Result<()> {
        self.write(&command.encode()).await
    }

    /// Push the pending buffer to the port in one write.
    ///
    /// A no-op when nothing is pending. On failure the buffer is kept intact so
    /// the flush can be retried.
    pub async fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let len = self.pending.len();
        let Some(port) = self.port.as_mut() else {
            return Err(LcdError::LinkClosed {
                path: self.path.clone(),
            });
        };

        let pending = &self.pending;
        self.diagnostics.payload("Flush", pending);
        let result = async {
            port.write_all(pending).await?;
            port.flush().await
        }
        .await;

        match result {
            Ok(()) => {
                trace!(parent: self.diagnostics.span(), "Flushed {} bytes", len);
                self.pending.clear();
                Ok(())
            }
            Err(source) => {
                warn!(parent: self.diagnostics.span(), "Flush of {} bytes failed: {}", len, source);
                Err(LcdError::write_failed(format!("flush of {} bytes", len), source))
            }
        }
    }

    /// Flush residual bytes and release the port. Safe to call repeatedly.
    pub async fn close(&mut self) -> Result<()> {
        if self.port.is_none() {
            return Ok(());
        }
        debug!(
            parent: self.diagnostics.span(),
            "Closing link ({} bytes pending)",
            self.pending.len()
        );
        let flushed = self.flush().await;
        self.pending.clear();
        if let Some(mut port) = self.port.take() {
            if let Err(e) = port.shutdown().await {
                debug!(parent: self.diagnostics.span(), "Port shutdown reported: {}", e);
            }
        }
        info!(parent: self.diagnostics.span(), "Link closed");
        flushed
    }

    /// Open a duplex session, or return the live one.
    pub fn start_session(&mut self) -> Result<Arc<Session>> {
        if let Some(session) = self.session.upgrade() {
            return Ok(session);
        }
        let Some(port) = self.port.as_ref() else {
            return Err(self.closed());
        };
        let reader = port.open_reader().map_err(|source| LcdError::Read { source })?;
        let session = Arc::new(Session::new(self.path.clone(), reader));
        self.session = Arc::downgrade(&session);
        Ok(session)
    }

    pub fn has_session(&self) -> bool {
        self.session.strong_count() > 0
    }

    /// Flush, discarding whatever was queued after `mark` if the flush fails.
    async fn flush_from(&mut self, mark: usize) -> Result<()> {
        let result = self.flush().await;
        if result.is_err() && self.pending.len() > mark {
            debug!(
                parent: self.diagnostics.span(),
                "Discarding {} unsent bytes",
                self.pending.len() - mark
            );
            self.pending.truncate(mark);
        }
        result
    }

    /// Upload a full frame and flush immediately.
    ///
    /// A frame that fails to go out is dropped rather than queued behind the
    /// next one, so the panel only ever receives the latest image.
    pub async fn upload_image(&mut self, image: &WireImage) -> Result<()> {
        let mark = self.pending.len();
        self.send(&Command::UploadImage(Box::new(image.clone()))).await?;
        self.flush_from(mark).await
    }

    /// Set an indicator color and flush. Unsent LED commands are dropped on
    /// failure.
    pub async fn set_led(&mut self, led: Led, color: LedColor) -> Result<()> {
        debug!(parent: self.diagnostics.span(), "{} -> {}", led, color);
        let mark = self.pending.len();
        for value in color.raw_values(led) {
            self.send(&Command::Led(value)).await?;
        }
        self.flush_from(mark).await
    }

    pub async fn set_led_raw(&mut self, value: u8) -> Result<()> {
        self.send(&Command::Led(value)).await
    }

    pub async fn init(&mut self) -> Result<()> {
        self.send(&Command::Init).await
    }

    pub async fn clear(&mut self) -> Result<()> {
        self.send(&Command::Clear).await
    }

    pub async fn home(&mut self) -> Result<()> {
        self.send(&Command::Home).await
    }

    pub async fn set_backlight(&mut self, level: u8) -> Result<()> {
        self.send(&Command::Backlight(level)).await
    }

    pub async fn show_page(&mut self, page: u8) -> Result<()> {
        self.send(&Command::ShowPage(page)).await
    }

    pub async fn save_page(&mut self, page: u8) -> Result<()> {
        self.send(&Command::SavePage(page)).await
    }

    pub async fn set_inverted(&mut self, inverted: bool) -> Result<()> {
        self.send(&Command::Inverted(inverted)).await
    }

    pub async fn move_cursor(&mut self, direction: CursorDirection) -> Result<()> {
        self.send(&Command::MoveCursor(direction)).await
    }

    pub async fn cursor_home(&mut self) -> Result<()> {
        self.move_cursor(CursorDirection::Home).await
    }

    /// Text for the display's built-in character mode.
    pub async fn write_text(&mut self, text: &str) -> Result<()> {
        self.write(text.as_bytes()).await
    }

    pub async fn write_text_line(&mut self, text: &str) -> Result<()> {
        let mut bytes = Vec::with_capacity(text.len() + 1);
        bytes.extend_from_slice(text.as_bytes());
        bytes.push(b'\n');
        self.write(&bytes).await
    }
}

impl std::fmt::Debug for DeviceLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceLink")
            .field("path", &self.path)
            .field("open", &self.port.is_some())
            .field("pending", &self.pending.len())
            .field("command_delay", &self.command_delay)
            .finish()
    }
}

impl Drop for DeviceLink {
    fn drop(&mut self) {
        if self.port.is_some() && !self.pending.is_empty() {
            warn!(
                parent: self.diagnostics.span(),
                "Link dropped with {} unflushed bytes; call close() first",
                self.pending.len()
            );
        }
    }
}
