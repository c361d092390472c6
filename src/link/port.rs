//! Serial port backends

use std::io;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncWrite};

/// Boxed read half handed to a [`Session`](super::Session).
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// A byte sink connected to the display, able to hand out independent read halves.
///
/// The link owns the write half for its whole lifetime; read halves share the
/// underlying handle and never close it.
pub trait SerialPort: AsyncWrite + Send + Unpin {
    /// Open a read half over the same physical link.
    fn open_reader(&self) -> io::Result<BoxedReader>;
}

/// Line rate fixed by the display firmware.
pub const BAUD_RATE: u32 = 115_200;

/// A tty (or any character device / file) opened for read and write.
///
/// Real terminals are switched to raw 8N1 at 115200 baud with a 100 ms read
/// timeout; other file types are used as-is.
#[cfg(unix)]
pub struct TtyPort {
    writer: tokio::fs::File,
    handle: std::fs::File,
}

#[cfg(unix)]
impl TtyPort {
    pub fn open(path: &Path) -> io::Result<Self> {
        use std::os::fd::AsRawFd;
        use std::os::unix::fs::OpenOptionsExt;

        let handle = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(path)?;

        let fd = handle.as_raw_fd();
        // SAFETY: fd belongs to `handle`, which is open for the duration of the call.
        if unsafe { libc::isatty(fd) } == 1 {
            configure_line(fd)?;
            tracing::debug!("Configured {} for {} baud 8N1 raw", path.display(), BAUD_RATE);
        } else {
            tracing::debug!("{} is not a tty, skipping line configuration", path.display());
        }

        let writer = tokio::fs::File::from_std(handle.try_clone()?);
        Ok(Self { writer, handle })
    }
}

#[cfg(unix)]
fn configure_line(fd: std::os::fd::RawFd) -> io::Result<()> {
    // SAFETY: termios is a plain C struct; zeroed is a valid baseline for tcgetattr to fill.
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };
    // SAFETY: fd is an open tty and tio points to a live termios.
    if unsafe { libc::tcgetattr(fd, &mut tio) } != 0 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: tio was initialized by tcgetattr above.
    unsafe { libc::cfmakeraw(&mut tio) };
    tio.c_cflag |= libc::CS8 | libc::CLOCAL | libc::CREAD;
    tio.c_cflag &= !(libc::PARENB | libc::CSTOPB | libc::CRTSCTS);
    tio.c_cc[libc::VMIN] = 0;
    tio.c_cc[libc::VTIME] = 1;

    // SAFETY: tio is a valid termios and B115200 is a supported speed constant.
    unsafe {
        if libc::cfsetispeed(&mut tio, libc::B115200) != 0
            || libc::cfsetospeed(&mut tio, libc::B115200) != 0
        {
            return Err(io::Error::last_os_error());
        }
    }

    // SAFETY: fd is an open tty and tio is fully initialized.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tio) } != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: discarding queued bytes on an open tty has no memory effects.
    unsafe { libc::tcflush(fd, libc::TCIOFLUSH) };
    Ok(())
}

#[cfg(unix)]
impl AsyncWrite for TtyPort {
    fn poll_write(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<io::Result<usize>> {
        std::pin::Pin::new(&mut self.writer).poll_write(cx, buf)
    }

    fn poll_flush(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        std::pin::Pin::new(&mut self.writer).poll_flush(cx)
    }

    fn poll_shutdown(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        std::pin::Pin::new(&mut self.writer).poll_shutdown(cx)
    }
}

#[cfg(unix)]
impl SerialPort for TtyPort {
    fn open_reader(&self) -> io::Result<BoxedReader> {
        let reader = tokio::fs::File::from_std(self.handle.try_clone()?);
        Ok(Box::new(reader))
    }
}

/// Open the platform serial port at `path`.
#[cfg(unix)]
pub fn open_port(path: &Path) -> io::Result<Box<dyn SerialPort>> {
    Ok(Box::new(TtyPort::open(path)?))
}

#[cfg(not(unix))]
pub fn open_port(_path: &Path) -> io::Result<Box<dyn SerialPort>> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "serial ports require a Unix host"))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn regular_files_open_without_line_configuration() {
        let path = crate::test_utils::temp_path("port.bin");
        std::fs::write(&path, [0x44]).expect("create temp file");

        let mut port = TtyPort::open(&path).expect("open temp file");
        let mut reader = port.open_reader().expect("reader");
        let mut buf = [0u8; 16];
        let n = reader.read(&mut buf).await.expect("read");
        assert_eq!(&buf[..n], &[0x44]);

        port.write_all(&[0x1B, 0x40]).await.expect("write");
        port.flush().await.expect("flush");
        assert_eq!(std::fs::read(&path).expect("read back"), vec![0x44, 0x1B, 0x40]);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_paths_fail_to_open() {
        let result = TtyPort::open(Path::new("/nonexistent/ezio/ttyS9"));
        assert!(result.is_err());
    }
}
