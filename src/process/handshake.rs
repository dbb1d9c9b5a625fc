/*!
 * Handshake Channel
 *
 * One-way pipe from a spawned component to its supervisor. The child writes
 * a single JSON object mapping deployed task names to addresses and closes
 * its end; the supervisor accumulates bytes without blocking and parses the
 * message once, at EOF. A partial message is never interpreted.
 */

use super::core::types::HandshakeError;
use crate::core::limits::{HANDSHAKE_READ_CHUNK, MAX_HANDSHAKE_BYTES};
use crate::core::serialization::unique_map;
use crate::core::types::AddressMap;
use nix::fcntl::OFlag;
use nix::unistd::pipe2;
use std::collections::BTreeSet;
use std::io;
use std::os::fd::OwnedFd;
use thiserror::Error;
use tokio::io::AsyncReadExt as _;
use tokio::net::unix::pipe;

/// Read side of a handshake channel
#[derive(Debug)]
pub struct HandshakeChannel {
    receiver: pipe::Receiver,
    buffer: Vec<u8>,
    closed: bool,
}

/// Outcome of a read attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadProgress {
    /// The writer has not closed its end yet
    Pending,
    /// EOF reached, the buffer holds the whole message
    Closed,
}

impl HandshakeChannel {
    /// Create a channel, returning it with the write end for the child
    ///
    /// Both ends are close-on-exec; the spawner clears the flag on the write
    /// end in the child only. Must be called within a tokio runtime.
    pub fn open() -> io::Result<(Self, OwnedFd)> {
        let (read, write) = pipe2(OFlag::O_CLOEXEC)?;
        let receiver = pipe::Receiver::from_owned_fd(read)?;
        Ok((
            Self {
                receiver,
                buffer: Vec::new(),
                closed: false,
            },
            write,
        ))
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Read whatever is available right now without waiting
    pub fn poll(&mut self) -> Result<ReadProgress, HandshakeReadError> {
        if self.closed {
            return Ok(ReadProgress::Closed);
        }
        let mut chunk = [0u8; HANDSHAKE_READ_CHUNK];
        loop {
            match self.receiver.try_read(&mut chunk) {
                Ok(0) => {
                    self.closed = true;
                    return Ok(ReadProgress::Closed);
                }
                Ok(n) => self.append(&chunk[..n])?,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(ReadProgress::Pending)
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HandshakeReadError::Io(e)),
            }
        }
    }

    /// Read until the writer closes its end
    ///
    /// Cancel-safe: bytes already received stay in the buffer when the
    /// returned future is dropped.
    pub async fn read_to_close(&mut self) -> Result<(), HandshakeReadError> {
        let mut chunk = [0u8; HANDSHAKE_READ_CHUNK];
        while !self.closed {
            match self.receiver.read(&mut chunk).await {
                Ok(0) => self.closed = true,
                Ok(n) => self.append(&chunk[..n])?,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HandshakeReadError::Io(e)),
            }
        }
        Ok(())
    }

    /// Parse the complete message against the names the process may report
    pub fn parse(&self, expected: &BTreeSet<String>) -> Result<AddressMap, HandshakeError> {
        parse_message(&self.buffer, expected)
    }

    fn append(&mut self, bytes: &[u8]) -> Result<(), HandshakeReadError> {
        if self.buffer.len() + bytes.len() > MAX_HANDSHAKE_BYTES {
            return Err(HandshakeError::TooLarge {
                limit: MAX_HANDSHAKE_BYTES,
            }
            .into());
        }
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }
}

/// Failure while reading the channel
#[derive(Error, Debug)]
pub enum HandshakeReadError {
    #[error("handshake channel read failed: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Protocol(#[from] HandshakeError),
}

/// Parse a complete handshake message
///
/// Every key must be one of `expected`; a message naming any other task is
/// rejected as a whole. A subset of `expected` is accepted. A task reported
/// twice makes the message malformed.
pub fn parse_message(
    bytes: &[u8],
    expected: &BTreeSet<String>,
) -> Result<AddressMap, HandshakeError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(HandshakeError::Malformed(
            "channel closed without a message".to_string(),
        ));
    }

    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    let message: AddressMap = unique_map(&mut deserializer)
        .and_then(|message| deserializer.end().map(|()| message))
        .map_err(|e| HandshakeError::Malformed(e.to_string()))?;

    if let Some(unexpected) = message.keys().find(|name| !expected.contains(*name)) {
        return Err(HandshakeError::UnexpectedTask {
            name: unexpected.clone(),
            expected: expected.iter().cloned().collect(),
        });
    }
    Ok(message)
}
