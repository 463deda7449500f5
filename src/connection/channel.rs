//! Line-framed bidirectional byte channel to an agent.
//!
//! Every frame is a UTF-8 line terminated by `\n`. The channel optionally
//! owns the agent's child process so that closing the channel also
//! terminates the agent.
//!
//! Reading and writing lock separately. Correlated requests carry a numeric
//! id as the first token of the frame; whichever requester currently holds
//! the read half routes every response to the requester waiting on its id,
//! so one unanswered request never delays answers to the others.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::process::Child;
use tokio::sync::{Mutex, oneshot};
use tracing::debug;

/// Maximum accepted frame length in bytes, excluding the line terminator.
pub const MAX_FRAME_BYTES: usize = 4096;

/// Channel handle shared between a connection and its clones.
pub type SharedChannel = Arc<AgentChannel>;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
type PendingResponses = HashMap<u64, oneshot::Sender<String>>;

/// Read half with the bytes of a frame that is still incomplete.
///
/// The partial buffer survives a dropped read, so a read cancelled by a
/// timeout resumes at the same byte instead of mid-line.
struct FrameReader {
    reader: BufReader<BoxedReader>,
    partial: Vec<u8>,
}

impl FrameReader {
    async fn next_frame(&mut self) -> io::Result<Option<String>> {
        let remaining = (MAX_FRAME_BYTES + 1).saturating_sub(self.partial.len());
        let limit = u64::try_from(remaining).unwrap_or(u64::MAX);
        let read = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut self.partial)
            .await?;
        let mut frame = std::mem::take(&mut self.partial);
        if read == 0 && frame.is_empty() {
            return Ok(None);
        }

        if frame.last() == Some(&b'\n') {
            frame.pop();
        } else if frame.len() > MAX_FRAME_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("agent frame exceeds {MAX_FRAME_BYTES} bytes"),
            ));
        }
        if frame.last() == Some(&b'\r') {
            frame.pop();
        }

        String::from_utf8(frame)
            .map(Some)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }
}

/// Bidirectional framed channel to one agent.
pub struct AgentChannel {
    reader: Mutex<FrameReader>,
    writer: Mutex<BoxedWriter>,
    process: Mutex<Option<Child>>,
    process_id: Option<u32>,
    pending: StdMutex<PendingResponses>,
    closed: AtomicBool,
}

impl AgentChannel {
    /// Creates a channel over a reader and writer pair.
    pub fn new(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        let boxed_reader: BoxedReader = Box::new(reader);
        let boxed_writer: BoxedWriter = Box::new(writer);
        Self {
            reader: Mutex::new(FrameReader {
                reader: BufReader::new(boxed_reader),
                partial: Vec::new(),
            }),
            writer: Mutex::new(boxed_writer),
            process: Mutex::new(None),
            process_id: None,
            pending: StdMutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Attaches the agent process, which is killed when the channel closes.
    #[must_use]
    pub fn with_process(mut self, child: Child) -> Self {
        self.process_id = child.id();
        *self.process.get_mut() = Some(child);
        self
    }

    /// Wraps the channel for sharing between connection clones.
    #[must_use]
    pub fn into_shared(self) -> SharedChannel {
        Arc::new(self)
    }

    /// Returns the OS process identifier of an attached agent while the
    /// channel is open.
    #[must_use]
    pub fn process_id(&self) -> Option<u32> {
        if self.is_closed() {
            return None;
        }
        self.process_id
    }

    /// Returns whether [`AgentChannel::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Reads the next frame without its line terminator.
    ///
    /// Returns `Ok(None)` at end of stream. Dropping the returned future
    /// keeps the bytes already read for the next call.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::InvalidData`] when a frame exceeds
    /// [`MAX_FRAME_BYTES`] or is not valid UTF-8, and
    /// [`io::ErrorKind::NotConnected`] after the channel was closed.
    pub async fn read_frame(&self) -> io::Result<Option<String>> {
        self.ensure_open()?;
        self.reader.lock().await.next_frame().await
    }

    /// Writes one frame followed by a line terminator and flushes.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::InvalidInput`] when the frame contains a
    /// newline, [`io::ErrorKind::NotConnected`] after the channel was closed,
    /// and transport write errors otherwise.
    pub async fn write_frame(&self, frame: &str) -> io::Result<()> {
        self.ensure_open()?;
        if frame.contains('\n') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "agent frames must not contain newlines",
            ));
        }
        let mut writer = self.writer.lock().await;
        writer.write_all(frame.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await
    }

    /// Sends `frame`, whose first token is `request_id`, and waits for the
    /// response frame carrying the same id.
    ///
    /// Returns the response without its id, or `Ok(None)` when the channel
    /// closes first. Responses to other requests read meanwhile are handed
    /// to their requesters; frames nobody waits for are discarded. Dropping
    /// the returned future abandons the request.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::NotConnected`] after the channel was closed,
    /// and transport or framing errors otherwise.
    pub async fn request(&self, request_id: u64, frame: &str) -> io::Result<Option<String>> {
        self.ensure_open()?;
        let (sender, mut receiver) = oneshot::channel();
        let _registration = PendingRequest::register(&self.pending, request_id, sender)?;
        self.write_frame(frame).await?;

        loop {
            let mut reader = tokio::select! {
                biased;
                response = &mut receiver => return Ok(response.ok()),
                guard = self.reader.lock() => guard,
            };
            tokio::select! {
                biased;
                response = &mut receiver => return Ok(response.ok()),
                next = reader.next_frame() => match next? {
                    Some(response) => self.route(&response),
                    None => {
                        self.abandon_pending();
                        return Ok(None);
                    }
                },
            }
        }
    }

    /// Closes the channel and terminates an attached agent process.
    ///
    /// Pending requests resolve as closed. Closing an already closed channel
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns errors from killing or reaping the agent process.
    pub async fn close(&self) -> io::Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.abandon_pending();

        if let Err(err) = self.writer.lock().await.shutdown().await {
            debug!(error = %err, "agent channel writer already closed");
        }

        let child = self.process.lock().await.take();
        if let Some(mut child) = child {
            if child.id().is_some() {
                child.start_kill()?;
            }
            let status = child.wait().await?;
            debug!(%status, "agent process exited");
        }
        Ok(())
    }

    fn route(&self, frame: &str) {
        let (id, body) = frame.split_once(' ').unwrap_or((frame, ""));
        let waiting = id.parse::<u64>().ok().and_then(|request_id| {
            self.pending
                .lock()
                .ok()
                .and_then(|mut pending| pending.remove(&request_id))
        });
        match waiting {
            Some(sender) => {
                if sender.send(body.to_owned()).is_err() {
                    debug!(%frame, "requester gave up before its response arrived");
                }
            }
            None => debug!(%frame, "discarding uncorrelated agent frame"),
        }
    }

    fn abandon_pending(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.clear();
        }
    }

    fn ensure_open(&self) -> io::Result<()> {
        if self.is_closed() {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "agent channel is closed",
            ));
        }
        Ok(())
    }
}

/// Registration of a waiting requester, removed when the request ends.
struct PendingRequest<'a> {
    pending: &'a StdMutex<PendingResponses>,
    request_id: u64,
}

impl<'a> PendingRequest<'a> {
    fn register(
        pending: &'a StdMutex<PendingResponses>,
        request_id: u64,
        sender: oneshot::Sender<String>,
    ) -> io::Result<Self> {
        pending
            .lock()
            .map_err(|err| io::Error::other(err.to_string()))?
            .insert(request_id, sender);
        Ok(Self {
            pending,
            request_id,
        })
    }
}

impl Drop for PendingRequest<'_> {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&self.request_id);
        }
    }
}

impl fmt::Debug for AgentChannel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AgentChannel")
            .field("process_id", &self.process_id())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{DuplexStream, duplex};
    use tokio::time::timeout;

    fn controller_with_raw_agent() -> (AgentChannel, DuplexStream) {
        let (controller_side, agent_side) = duplex(64 * 1024);
        let (controller_read, controller_write) = tokio::io::split(controller_side);
        (AgentChannel::new(controller_read, controller_write), agent_side)
    }

    fn channel_pair() -> (AgentChannel, AgentChannel) {
        let (controller_side, agent_side) = duplex(64 * 1024);
        let (controller_read, controller_write) = tokio::io::split(controller_side);
        let (agent_read, agent_write) = tokio::io::split(agent_side);
        (
            AgentChannel::new(controller_read, controller_write),
            AgentChannel::new(agent_read, agent_write),
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn frames_round_trip_without_terminators() {
        let (controller, agent) = channel_pair();

        agent.write_frame("3.14.0").await.expect("write succeeds");
        let frame = controller.read_frame().await.expect("read succeeds");

        assert_eq!(frame.as_deref(), Some("3.14.0"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn end_of_stream_yields_none() {
        let (controller, agent) = channel_pair();

        agent.close().await.expect("close succeeds");
        drop(agent);

        assert_eq!(controller.read_frame().await.expect("read succeeds"), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn oversized_frames_are_rejected() {
        let (controller, agent) = channel_pair();

        let oversized = "x".repeat(MAX_FRAME_BYTES + 10);
        agent.write_frame(&oversized).await.expect("write succeeds");
        let err = controller
            .read_frame()
            .await
            .expect_err("oversized frame must fail");

        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn closed_channel_refuses_io() {
        let (controller, _agent) = channel_pair();

        controller.close().await.expect("close succeeds");

        assert!(controller.is_closed());
        let err = controller
            .write_frame("PING")
            .await
            .expect_err("closed channel must refuse writes");
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn interrupted_read_resumes_mid_frame() {
        let (controller, mut agent) = controller_with_raw_agent();

        agent.write_all(b"7 OK par").await.expect("write succeeds");
        let interrupted = timeout(Duration::from_millis(50), controller.read_frame()).await;
        assert!(interrupted.is_err(), "incomplete frame must not be returned");
        agent.write_all(b"tial\n").await.expect("write succeeds");

        let frame = controller.read_frame().await.expect("read succeeds");
        assert_eq!(frame.as_deref(), Some("7 OK partial"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unanswered_request_does_not_hold_back_other_responses() {
        let (controller, agent) = channel_pair();
        let controller = Arc::new(controller);
        let slow = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.request(1, "1 CLOCK").await }
        });
        assert_eq!(
            agent.read_frame().await.expect("read succeeds").as_deref(),
            Some("1 CLOCK")
        );

        let fast = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.request(2, "2 PING").await }
        });
        assert_eq!(
            agent.read_frame().await.expect("read succeeds").as_deref(),
            Some("2 PING")
        );
        agent.write_frame("2 OK").await.expect("write succeeds");

        let answered = timeout(Duration::from_secs(2), fast)
            .await
            .expect("second request answered while the first waits")
            .expect("task completes")
            .expect("request succeeds");
        assert_eq!(answered.as_deref(), Some("OK"));
        assert!(!slow.is_finished());

        agent.write_frame("1 OK 1700000000000").await.expect("write succeeds");
        let late = slow
            .await
            .expect("task completes")
            .expect("request succeeds");
        assert_eq!(late.as_deref(), Some("OK 1700000000000"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn closing_resolves_waiting_requests() {
        let (controller, _agent) = channel_pair();
        let controller = Arc::new(controller);
        let waiting = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.request(9, "9 ARCH").await }
        });
        tokio::task::yield_now().await;

        controller.close().await.expect("close succeeds");

        let outcome = timeout(Duration::from_secs(2), waiting)
            .await
            .expect("request resolves after close")
            .expect("task completes");
        match outcome {
            Ok(response) => assert_eq!(response, None),
            Err(err) => assert_eq!(err.kind(), io::ErrorKind::NotConnected),
        }
    }
}
