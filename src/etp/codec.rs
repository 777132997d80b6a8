//! Wire framing for protocol messages.
//!
//! A message crosses the transport as a small binary envelope followed
//! by a length-prefixed JSON body:
//!
//! ```text
//! [protocol u8][flags u8][message_id 16B][correlation_id 16B?][len u32][body]
//! ```
//!
//! The correlation id is present only when the correlated flag is set.
//! The multipart flag carries the header's `more_follows` bit.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::etp::types::{EtpMessage, MessageHeader, MessageId, Protocol};
use crate::utils::error::{EtpError, EtpResult};

const FLAG_CORRELATED: u8 = 0x01;
const FLAG_MORE_FOLLOWS: u8 = 0x02;

/// Upper bound on an encoded body; larger frames are rejected as malformed.
const MAX_BODY_LEN: usize = 16 * 1024 * 1024;

/// Encoder/decoder for the binary message envelope
#[derive(Debug, Default, Clone)]
pub struct EtpCodec;

impl EtpCodec {
    /// Creates a new codec instance
    pub fn new() -> Self {
        Self
    }

    /// Writes a message to a stream asynchronously
    pub async fn write_message_async<W>(&self, stream: &mut W, message: &EtpMessage) -> EtpResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        let mut buffer = BytesMut::new();

        buffer.extend_from_slice(&[message.header.protocol.as_u8()]);

        let mut flags = 0u8;
        if message.header.correlation_id.is_some() {
            flags |= FLAG_CORRELATED;
        }
        if message.header.more_follows {
            flags |= FLAG_MORE_FOLLOWS;
        }
        buffer.extend_from_slice(&[flags]);

        buffer.extend_from_slice(message.header.message_id.bytes());
        if let Some(correlation_id) = &message.header.correlation_id {
            buffer.extend_from_slice(correlation_id.bytes());
        }

        let body = serde_json::to_vec(&message.body)?;
        buffer.extend_from_slice(&(body.len() as u32).to_be_bytes());
        buffer.extend_from_slice(&body);

        stream.write_all(&buffer).await?;
        stream.flush().await?;

        Ok(())
    }

    /// Reads a message from a stream asynchronously
    pub async fn read_message_async<R>(&self, stream: &mut R) -> EtpResult<EtpMessage>
    where
        R: AsyncRead + Unpin,
    {
        let mut protocol_buf = [0u8; 1];
        stream.read_exact(&mut protocol_buf).await?;
        let protocol = Protocol::from_u8(protocol_buf[0])
            .ok_or_else(|| EtpError::InvalidMessage("Invalid protocol id".to_string()))?;

        let mut flags_buf = [0u8; 1];
        stream.read_exact(&mut flags_buf).await?;
        let flags = flags_buf[0];

        let mut id_buf = [0u8; 16];
        stream.read_exact(&mut id_buf).await?;
        let message_id = MessageId::from_bytes(id_buf);

        let correlation_id = if flags & FLAG_CORRELATED != 0 {
            let mut correlation_buf = [0u8; 16];
            stream.read_exact(&mut correlation_buf).await?;
            Some(MessageId::from_bytes(correlation_buf))
        } else {
            None
        };

        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await?;
        let body_len = u32::from_be_bytes(len_buf) as usize;
        if body_len > MAX_BODY_LEN {
            return Err(EtpError::InvalidMessage(format!(
                "Body length {} exceeds limit",
                body_len
            )));
        }

        let mut body_buf = vec![0u8; body_len];
        stream.read_exact(&mut body_buf).await?;
        let body = serde_json::from_slice(&body_buf)?;

        Ok(EtpMessage {
            header: MessageHeader {
                protocol,
                message_id,
                correlation_id,
                more_follows: flags & FLAG_MORE_FOLLOWS != 0,
            },
            body,
        })
    }
}
