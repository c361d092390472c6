//! In-memory serial port for dry runs and tests

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use super::port::{BoxedReader, SerialPort};
use crate::types::Button;

#[derive(Debug, Default)]
struct State {
    written: Vec<u8>,
    write_calls: usize,
    incoming: VecDeque<u8>,
    fail_writes: bool,
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A serial port backed by memory.
///
/// Everything written is captured for inspection through a [`MemoryPortHandle`];
/// bytes queued with [`MemoryPortHandle::press`] are returned to readers. An
/// empty queue reads as zero bytes, like a tty with a read timeout.
#[derive(Debug, Default)]
pub struct MemoryPort {
    state: Arc<Mutex<State>>,
}

/// Inspection and injection handle for a [`MemoryPort`].
#[derive(Debug, Clone)]
pub struct MemoryPortHandle {
    state: Arc<Mutex<State>>,
}

impl MemoryPort {
    pub fn new() -> (Self, MemoryPortHandle) {
        let port = Self::default();
        let handle = MemoryPortHandle {
            state: Arc::clone(&port.state),
        };
        (port, handle)
    }
}

impl MemoryPortHandle {
    /// All bytes written so far.
    pub fn written(&self) -> Vec<u8> {
        lock(&self.state).written.clone()
    }

    /// Drain and return the bytes written so far.
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut lock(&self.state).written)
    }

    /// Number of successful `poll_write` calls.
    pub fn write_calls(&self) -> usize {
        lock(&self.state).write_calls
    }

    /// Queue a button press for readers.
    pub fn press(&self, button: Button) {
        self.push_incoming(&[button.code()]);
    }

    /// Queue raw bytes for readers.
    pub fn push_incoming(&self, bytes: &[u8]) {
        lock(&self.state).incoming.extend(bytes.iter().copied());
    }

    /// Make subsequent writes fail with `BrokenPipe`.
    pub fn set_fail_writes(&self, fail: bool) {
        lock(&self.state).fail_writes = fail;
    }
}

impl AsyncWrite for MemoryPort {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut state = lock(&self.state);
        if state.fail_writes {
            let error = io::Error::new(io::ErrorKind::BrokenPipe, "injected write failure");
            return Poll::Ready(Err(error));
        }
        state.written.extend_from_slice(buf);
        state.write_calls += 1;
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl SerialPort for MemoryPort {
    fn open_reader(&self) -> io::Result<BoxedReader> {
        Ok(Box::new(MemoryReader {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MemoryReader {
    state: Arc<Mutex<State>>,
}

impl AsyncRead for MemoryReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let mut state = lock(&self.state);
        while buf.remaining() > 0 {
            match state.incoming.pop_front() {
                Some(byte) => buf.put_slice(&[byte]),
                None => break,
            }
        }
        Poll::Ready(Ok(()))
    }
}
