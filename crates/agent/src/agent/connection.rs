//! Per-connection framing and driving.
//!
//! # Framing
//!
//! Each request is a 4-byte big-endian length followed by that many
//! payload bytes (the payload begins with the type byte). The
//! [`FrameDecoder`] is a resumable parser with a single suspension point,
//! "need more bytes": [`FrameDecoder::push`] consumes whatever chunk the
//! socket produced and emits the frame events completed by it, surviving
//! arbitrary chunking.
//!
//! A declared length of `AGENT_MAX_MSGLEN - 4` or more is refused *before*
//! the payload is drained: the overlong event is emitted as soon as the
//! length header is complete, so a peer streaming a huge body still sees
//! prompt feedback, and the body is then discarded without buffering.
//!
//! # Driving
//!
//! [`serve_stream`] owns one connection end to end: it allocates a reply
//! slot per accepted request in arrival order, spawns a handler task per
//! request, and writes completed replies in slot order through the
//! [`ResponseQueue`]. On EOF or a transport error it unregisters the
//! client, which cancels every in-flight handler; a cancelled handler
//! produces no reply.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _};
use tokio::sync::mpsc;
use vigil_platform::VigilResult;
use zeroize::Zeroizing;

use crate::agent::client::{ClientInfo, ClientRegistry};
use crate::agent::handler::RequestHandler;
use crate::agent::message::SSH_AGENT_FAILURE;
use crate::agent::queue::ResponseQueue;
use crate::agent::AGENT_MAX_MSGLEN;

/// A completed framing event.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameEvent {
    /// A full request payload, ready for dispatch.
    Request(Vec<u8>),
    /// A frame whose declared length exceeds the message limit. Emitted
    /// when the length header completes; the body is discarded.
    Overlong {
        /// The declared payload length.
        length: u32,
    },
}

#[derive(Debug)]
enum Phase {
    Length,
    Payload,
    Discard,
}

/// Resumable length-prefixed frame parser.
#[derive(Debug)]
pub struct FrameDecoder {
    phase: Phase,
    lenbuf: [u8; 4],
    got: usize,
    len: usize,
    payload: Vec<u8>,
    discard: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self {
            phase: Phase::Length,
            lenbuf: [0; 4],
            got: 0,
            len: 0,
            payload: Vec::new(),
            discard: 0,
        }
    }
}

impl FrameDecoder {
    /// Creates a decoder expecting a length header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one chunk of stream data, returning the frame events it
    /// completed, in stream order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<FrameEvent> {
        let mut events = Vec::new();
        let mut i = 0;

        while i < chunk.len() {
            match self.phase {
                Phase::Length => {
                    let take = (4 - self.got).min(chunk.len() - i);
                    self.lenbuf[self.got..self.got + take].copy_from_slice(&chunk[i..i + take]);
                    self.got += take;
                    i += take;
                    if self.got < 4 {
                        continue;
                    }
                    self.got = 0;

                    let length = u32::from_be_bytes(self.lenbuf);
                    if length as usize >= AGENT_MAX_MSGLEN - 4 {
                        events.push(FrameEvent::Overlong { length });
                        self.discard = length as usize;
                        self.phase = Phase::Discard;
                    } else if length == 0 {
                        events.push(FrameEvent::Request(Vec::new()));
                    } else {
                        self.len = length as usize;
                        self.payload = Vec::with_capacity(self.len);
                        self.phase = Phase::Payload;
                    }
                }
                Phase::Payload => {
                    let take = (self.len - self.payload.len()).min(chunk.len() - i);
                    self.payload.extend_from_slice(&chunk[i..i + take]);
                    i += take;
                    if self.payload.len() == self.len {
                        events.push(FrameEvent::Request(std::mem::take(&mut self.payload)));
                        self.phase = Phase::Length;
                    }
                }
                Phase::Discard => {
                    let take = self.discard.min(chunk.len() - i);
                    self.discard -= take;
                    i += take;
                    if self.discard == 0 {
                        self.phase = Phase::Length;
                    }
                }
            }
        }

        events
    }
}

/// Writes one framed reply.
async fn write_frame<W>(writer: &mut W, reply: &[u8]) -> VigilResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut frame = Vec::with_capacity(4 + reply.len());
    frame.extend_from_slice(&(reply.len() as u32).to_be_bytes());
    frame.extend_from_slice(reply);
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Serves one client connection until EOF or a transport error.
///
/// Registers a client handle, drives the frame decoder over the stream,
/// dispatches each request to `handler` on its own task, and writes
/// replies in request-arrival order. On return the client is
/// unregistered and every in-flight request for it has been cancelled.
///
/// The stream can be any framed byte transport: a Unix socket accepted by
/// the listener, an inherited socket, or an in-process duplex channel.
pub async fn serve_stream<S, H>(
    handler: Arc<H>,
    registry: Arc<ClientRegistry>,
    stream: S,
    suppress_logging: bool,
) -> VigilResult<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
    H: RequestHandler,
{
    let client = registry.register(suppress_logging);
    let conn_index = client.conn_index();
    let result = drive(handler, &registry, &client, stream).await;
    registry.unregister(conn_index);
    result
}

async fn drive<S, H>(
    handler: Arc<H>,
    registry: &ClientRegistry,
    client: &ClientInfo,
    stream: S,
) -> VigilResult<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
    H: RequestHandler,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let (tx, mut rx) = mpsc::unbounded_channel::<(u64, Vec<u8>)>();
    let mut decoder = FrameDecoder::new();
    let mut queue = ResponseQueue::new();
    let mut readbuf = [0u8; 4096];

    loop {
        tokio::select! {
            read = reader.read(&mut readbuf) => {
                let n = read?;
                if n == 0 {
                    // Peer closed; pending operations are cancelled by
                    // the caller's unregister.
                    return Ok(());
                }
                for event in decoder.push(&readbuf[..n]) {
                    let index = queue.allocate();
                    match event {
                        FrameEvent::Overlong { length } => {
                            client.log(index, format_args!(
                                "early reply: SSH_AGENT_FAILURE (overlong message, length {})",
                                length
                            ));
                            for reply in queue.complete(index, vec![SSH_AGENT_FAILURE]) {
                                write_frame(&mut writer, &reply).await?;
                            }
                        }
                        FrameEvent::Request(payload) => {
                            let handler = Arc::clone(&handler);
                            let task_client = client.clone();
                            let tx = tx.clone();
                            // Request bodies can carry private key
                            // material; the task's copy is wiped once the
                            // reply is produced.
                            let payload = Zeroizing::new(payload);
                            let task = tokio::spawn(async move {
                                let reply = handler.handle(&task_client, index, &payload).await;
                                let _ = tx.send((index, reply));
                            });
                            registry.track(client.conn_index(), task.abort_handle());
                        }
                    }
                }
            }
            Some((index, reply)) = rx.recv() => {
                for reply in queue.complete(index, reply) {
                    write_frame(&mut writer, &reply).await?;
                }
            }
        }
    }
}
