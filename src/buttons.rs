//! Front-panel button input.
//!
//! [`ButtonSource`] decodes the single-byte key codes the display sends on its
//! read half. Callers either poll with [`ButtonSource::try_read`] or start a
//! background poll loop with [`ButtonSource::channel`], which yields presses as a
//! [`Stream`] until [`ButtonPoller::stop`] is called.
//!
//! The event queue is bounded. When the consumer falls behind, new presses are
//! dropped so the poll loop never waits on the consumer.

use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::Result;
use crate::link::Session;
use crate::types::Button;

/// Bytes requested from the session per read.
pub const READ_CHUNK: usize = 16;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

const READ_ERROR_BACKOFF: Duration = Duration::from_millis(250);

/// Decodes button presses from a link session.
#[derive(Debug, Clone)]
pub struct ButtonSource {
    session: Arc<Session>,
    poll_interval: Duration,
    queue_capacity: usize,
}

impl ButtonSource {
    pub fn new(session: Arc<Session>) -> Self {
        Self::with_config(session, DEFAULT_POLL_INTERVAL, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_config(
        session: Arc<Session>,
        poll_interval: Duration,
        queue_capacity: usize,
    ) -> Self {
        Self {
            session,
            poll_interval,
            queue_capacity: queue_capacity.max(1),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Non-blocking read. Returns the last press in the pending bytes, or `None`
    /// when nothing is waiting.
    pub fn try_read(&self) -> Result<Option<Button>> {
        let mut buf = [0u8; READ_CHUNK];
        let Some(n) = self.session.try_read(&mut buf)? else {
            return Ok(None);
        };
        Ok(buf[..n].iter().rev().find_map(|code| Button::press_from_code(*code)))
    }

    /// Start the background poll loop.
    ///
    /// The returned stream ends only after [`ButtonPoller::stop`] (or dropping the
    /// poller) has terminated the loop.
    pub fn channel(&self) -> (ButtonEvents, ButtonPoller) {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let cancel = CancellationToken::new();

        let session = Arc::clone(&self.session);
        let poll_interval = self.poll_interval;
        let cancel_task = cancel.clone();
        let handle = tokio::spawn(async move {
            Self::poll_task(session, tx, poll_interval, cancel_task).await;
        });

        let events = ButtonEvents {
            inner: ReceiverStream::new(rx),
        };
        let poller = ButtonPoller {
            cancel,
            handle: Some(handle),
        };
        (events, poller)
    }

    async fn poll_task(
        session: Arc<Session>,
        tx: mpsc::Sender<Button>,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) {
        info!("Button poller started on {}", session.path().display());
        let mut delivered = 0u64;
        let mut dropped = 0u64;
        let mut buf = [0u8; READ_CHUNK];

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = session.read(&mut buf) => result,
            };

            let pause = match result {
                Ok(n) => {
                    let presses = buf[..n].iter().filter_map(|code| Button::press_from_code(*code));
                    for button in presses {
                        match tx.try_send(button) {
                            Ok(()) => {
                                delivered += 1;
                                trace!("Button {}", button);
                            }
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                dropped += 1;
                                debug!("Button queue full, dropping {}", button);
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => {
                                debug!("Button receiver dropped");
                            }
                        }
                    }
                    poll_interval
                }
                Err(e) => {
                    warn!("Button read failed: {}", e);
                    READ_ERROR_BACKOFF
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        info!("Button poller stopped ({} delivered, {} dropped)", delivered, dropped);
        drop(tx);
    }
}

/// Stop handle for a running poll loop.
#[derive(Debug)]
pub struct ButtonPoller {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ButtonPoller {
    /// Stop the loop and wait for it to exit. Safe to call more than once.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Button poller task failed: {}", e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Drop for ButtonPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pin_project! {
    /// Stream of button presses produced by a poll loop.
    pub struct ButtonEvents {
        #[pin]
        inner: ReceiverStream<Button>,
    }
}

impl ButtonEvents {
    /// Wait for the next press. `None` once the poll loop has stopped.
    pub async fn recv(&mut self) -> Option<Button> {
        futures::StreamExt::next(&mut self.inner).await
    }
}

impl Stream for ButtonEvents {
    type Item = Button;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Button>> {
        self.project().inner.poll_next(cx)
    }
}

impl std::fmt::Debug for ButtonEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ButtonEvents").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{DeviceLink, LinkOptions};
    use futures::StreamExt;

    fn source() -> (DeviceLink, crate::link::MemoryPortHandle, ButtonSource) {
        let (mut link, handle) = DeviceLink::memory(LinkOptions::default());
        let session = link.start_session().expect("session");
        (link, handle, ButtonSource::new(session))
    }

    #[tokio::test]
    async fn try_read_returns_none_when_idle() {
        let (_link, _handle, buttons) = source();
        assert_eq!(buttons.try_read().expect("read"), None);
    }

    #[tokio::test]
    async fn try_read_keeps_the_last_press_in_a_chunk() {
        let (_link, handle, buttons) = source();
        handle.push_incoming(&[0x44, 0x00, 0x46, 0x99]);
        assert_eq!(buttons.try_read().expect("read"), Some(Button::Down));
        assert_eq!(buttons.try_read().expect("read"), None);
    }

    #[tokio::test]
    async fn channel_delivers_presses_in_order() {
        let _ = tracing_subscriber::fmt::try_init();
        let (_link, handle, buttons) = source();
        let (mut events, mut poller) = buttons.channel();

        handle.press(Button::Up);
        handle.press(Button::Enter);
        handle.push_incoming(&[0x00]);
        handle.press(Button::Esc);

        assert_eq!(events.next().await, Some(Button::Up));
        assert_eq!(events.next().await, Some(Button::Enter));
        assert_eq!(events.next().await, Some(Button::Esc));

        poller.stop().await;
        assert!(!poller.is_running());
        assert_eq!(events.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_drops_newest_presses() {
        let (mut link, handle) = DeviceLink::memory(LinkOptions::default());
        let session = link.start_session().expect("session");
        let buttons = ButtonSource::with_config(session, DEFAULT_POLL_INTERVAL, 2);
        let (mut events, mut poller) = buttons.channel();

        handle.push_incoming(&[0x41, 0x42, 0x43, 0x44]);
        tokio::time::sleep(DEFAULT_POLL_INTERVAL * 5).await;
        poller.stop().await;

        let received: Vec<Button> = events.by_ref().collect().await;
        assert_eq!(received, vec![Button::Help, Button::Left]);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let (_link, _handle, buttons) = source();
        let (_events, mut poller) = buttons.channel();
        poller.stop().await;
        poller.stop().await;
        assert!(poller.cancellation_token().is_cancelled());
    }
}
