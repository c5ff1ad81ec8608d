// src/connection/handler.rs

//! Defines the `ConnectionHandler` which manages the full lifecycle of a client connection.

use super::control::{ConnectionControl, ConnectionEnded, DisconnectReason};
use super::dispatcher::CommandDispatcher;
use super::guard::ConnectionGuard;
use super::idle::IdleTimeout;
use super::settings::ConnectionSettings;
use crate::core::engine::{ConnectionId, Engine, RevocationReceiver};
use crate::core::metrics;
use crate::core::protocol::{FrameCodec, FrameReassembler};
use crate::core::{IncomingCommand, OutgoingReply, ProtoServerError};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio_util::codec::Encoder;
use tracing::{debug, info, warn};

/// Size of the scratch buffer each socket read lands in.
const READ_CHUNK_SIZE: usize = 16 * 1024;

/// Once this many reply bytes are waiting for the peer, the handler stops
/// reading new requests until the backlog drains.
const MAX_PENDING_REPLY_BYTES: usize = 64 * 1024;

/// How long queued replies may take to reach the peer once the connection is closing.
const CLOSE_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Manages the full lifecycle of a client connection.
pub struct ConnectionHandler<S> {
    reader: ReadHalf<S>,
    writer: WriteHalf<S>,
    addr: SocketAddr,
    id: ConnectionId,
    read_chunk: Box<[u8]>,
    reassembler: FrameReassembler,
    reply_codec: FrameCodec,
    /// Framed replies not yet accepted by the socket.
    outgoing: BytesMut,
    dispatcher: CommandDispatcher,
    idle: IdleTimeout,
    revocations: RevocationReceiver,
    control_rx: mpsc::UnboundedReceiver<DisconnectReason>,
    events: mpsc::UnboundedSender<ConnectionEnded>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Creates a new `ConnectionHandler` together with the control handle the
    /// owner uses to revoke priorities and force the connection closed.
    ///
    /// The idle timer starts running immediately.
    pub fn new(
        stream: S,
        addr: SocketAddr,
        id: ConnectionId,
        engine: Arc<dyn Engine>,
        settings: ConnectionSettings,
        events: mpsc::UnboundedSender<ConnectionEnded>,
    ) -> (Self, ConnectionControl) {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (revocation_tx, revocations) = mpsc::unbounded_channel();
        let control = ConnectionControl::new(id, addr, control_tx, revocation_tx);

        let (reader, writer) = tokio::io::split(stream);

        let handler = Self {
            reader,
            writer,
            addr,
            id,
            read_chunk: vec![0u8; READ_CHUNK_SIZE].into_boxed_slice(),
            reassembler: FrameReassembler::new(settings.max_frame_size),
            reply_codec: FrameCodec::new(settings.max_frame_size),
            outgoing: BytesMut::new(),
            dispatcher: CommandDispatcher::new(engine, id, &settings),
            idle: IdleTimeout::new(settings.idle_timeout),
            revocations,
            control_rx,
            events,
        };
        (handler, control)
    }

    /// Serves the connection until it ends, then closes the socket and notifies
    /// the owner. Returns why the connection ended.
    pub async fn run(mut self) -> DisconnectReason {
        let mut guard = ConnectionGuard::new(self.id, self.addr, self.events.clone());
        let reason = self.serve().await;

        self.close_socket().await;
        info!(
            "Connection {} from {} ended: {}.",
            self.id, self.addr, reason
        );
        guard.set_reason(reason);
        reason
    }

    /// The main event loop for the connection.
    ///
    /// Replies are written from `outgoing` inside the same `select!` as the
    /// reads, so a peer that stops reading never blocks close signals or the
    /// idle timer.
    async fn serve(&mut self) -> DisconnectReason {
        loop {
            let can_write = !self.outgoing.is_empty();
            let can_read = self.outgoing.len() < MAX_PENDING_REPLY_BYTES;

            tokio::select! {
                // Control signals and revocations go before socket I/O.
                biased;
                Some(reason) = self.control_rx.recv() => {
                    info!("Connection {} from {} received close signal ({}).", self.id, self.addr, reason);
                    return reason;
                }
                Some(priority) = self.revocations.recv() => {
                    self.on_revocation_requested(priority);
                }
                _ = self.idle.expired() => {
                    warn!(
                        "Connection {} from {} idle for {:?}, disconnecting.",
                        self.id, self.addr, self.idle.period()
                    );
                    metrics::IDLE_TIMEOUTS_TOTAL.inc();
                    return DisconnectReason::IdleTimeout;
                }
                result = self.writer.write_buf(&mut self.outgoing), if can_write => {
                    match result {
                        Ok(0) => {
                            let e = std::io::Error::from(std::io::ErrorKind::WriteZero);
                            return self.classify_error(e.into());
                        }
                        Ok(_) => {}
                        Err(e) => return self.classify_error(e.into()),
                    }
                }
                result = self.reader.read(&mut self.read_chunk), if can_read => {
                    match result {
                        Ok(0) => {
                            debug!("Connection from {} closed by peer.", self.addr);
                            return DisconnectReason::PeerClosed;
                        }
                        Ok(n) => {
                            if let Err(e) = self.on_data_available(n) {
                                return self.classify_error(e);
                            }
                        }
                        Err(e) => return self.classify_error(e.into()),
                    }
                }
            }
        }
    }

    /// Feeds `n` freshly read bytes through the reassembler and queues the reply
    /// for every frame that became complete, in order.
    fn on_data_available(&mut self, n: usize) -> Result<(), ProtoServerError> {
        let payloads = self.reassembler.feed(&self.read_chunk[..n])?;
        for payload in payloads {
            let reply = match self.process_frame(&payload) {
                Ok(reply) => reply,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => OutgoingReply::from(&e),
            };
            self.idle.rearm();
            self.queue_reply(&reply)?;
        }
        Ok(())
    }

    fn process_frame(&mut self, payload: &[u8]) -> Result<OutgoingReply, ProtoServerError> {
        let command = IncomingCommand::decode(payload)?;
        debug!(
            "Connection {}: received command: {}",
            self.id,
            command.name()
        );
        Ok(self.dispatcher.dispatch(command))
    }

    fn on_revocation_requested(&mut self, priority: i32) {
        if self.dispatcher.revoke(priority) {
            debug!(
                "Connection {}: priority {} revoked by the engine.",
                self.id, priority
            );
        } else {
            debug!(
                "Connection {}: ignoring revocation of priority {} (registered: {:?}).",
                self.id,
                priority,
                self.dispatcher.registered_priority()
            );
        }
    }

    fn queue_reply(&mut self, reply: &OutgoingReply) -> Result<(), ProtoServerError> {
        debug!("Connection {}: queueing reply: {:?}", self.id, reply);
        self.reply_codec.encode(reply.to_payload(), &mut self.outgoing)
    }

    /// Gives queued replies a bounded chance to reach the peer, then shuts
    /// down the write side.
    async fn close_socket(&mut self) {
        let writer = &mut self.writer;
        let outgoing = &mut self.outgoing;
        let drain = async move {
            writer.write_all_buf(outgoing).await?;
            writer.shutdown().await
        };
        let result = tokio::time::timeout(CLOSE_DRAIN_TIMEOUT, drain).await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Connection {}: socket shutdown failed: {}", self.id, e),
            Err(_) => debug!(
                "Connection {}: peer stopped reading, dropping {} queued reply bytes.",
                self.id,
                self.outgoing.len()
            ),
        }
    }

    /// Maps a fatal error to the reason reported to the owner, logging it on the way.
    fn classify_error(&self, e: ProtoServerError) -> DisconnectReason {
        metrics::PROTOCOL_ERRORS_TOTAL
            .with_label_values(&[e.kind()])
            .inc();
        match &e {
            ProtoServerError::Io(_) if is_normal_disconnect(&e) => {
                debug!("Connection from {} closed by peer: {}", self.addr, e);
                DisconnectReason::PeerClosed
            }
            ProtoServerError::Io(_) => {
                warn!("Connection error for {}: {}", self.addr, e);
                DisconnectReason::TransportError
            }
            _ => {
                warn!(
                    "Protocol violation from {}, dropping connection: {}",
                    self.addr, e
                );
                DisconnectReason::ProtocolViolation
            }
        }
    }
}

/// Helper function to check for non-critical disconnection errors.
fn is_normal_disconnect(e: &ProtoServerError) -> bool {
    matches!(e, ProtoServerError::Io(arc_err) if matches!(
        arc_err.kind(),
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionAborted
    ))
}
