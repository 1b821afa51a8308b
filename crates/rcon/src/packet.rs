//! RCON packet framing.
//!
//! Every packet on the wire is:
//!
//! ```text
//! i32 LE length | i32 LE request id | i32 LE type | body bytes | 0x00 0x00
//! ```
//!
//! where `length` counts everything after itself. Minecraft servers accept
//! request bodies up to 1446 bytes and send response fragments of at most
//! 4096 bytes.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{RconError, Result};

/// Largest command body a Minecraft server accepts.
pub const MAX_COMMAND_LEN: usize = 1446;

/// Smallest legal value of the length field (id + type + two NULs).
const MIN_PACKET_LEN: i32 = 10;

/// Largest legal value of the length field for packets sent by the server.
const MAX_PACKET_LEN: i32 = 4096 + MIN_PACKET_LEN;

/// Packet type field.
///
/// `AuthResponse` and `ExecCommand` share the value 2 on the wire; which one
/// is meant depends on the direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// Client login request carrying the password.
    Auth,
    /// Server reply to a login request.
    AuthResponse,
    /// Client command request.
    ExecCommand,
    /// Server reply to a command.
    ResponseValue,
    /// Anything else the server might send.
    Unknown(i32),
}

impl PacketType {
    fn to_wire(self) -> i32 {
        match self {
            PacketType::Auth => 3,
            PacketType::AuthResponse | PacketType::ExecCommand => 2,
            PacketType::ResponseValue => 0,
            PacketType::Unknown(v) => v,
        }
    }

    /// Decode a type field received from the server.
    fn from_server(value: i32) -> Self {
        match value {
            2 => PacketType::AuthResponse,
            0 => PacketType::ResponseValue,
            other => PacketType::Unknown(other),
        }
    }
}

/// A single RCON packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Client-chosen id echoed back by the server (`-1` on auth failure).
    pub id: i32,
    /// Packet type.
    pub kind: PacketType,
    /// Payload text.
    pub body: String,
}

impl Packet {
    /// Build a login packet.
    pub fn auth(id: i32, password: &str) -> Self {
        Self {
            id,
            kind: PacketType::Auth,
            body: password.to_string(),
        }
    }

    /// Build a command packet.
    pub fn command(id: i32, command: &str) -> Self {
        Self {
            id,
            kind: PacketType::ExecCommand,
            body: command.to_string(),
        }
    }

    /// Serialize the packet into its wire representation.
    pub fn encode(&self) -> Vec<u8> {
        let body = self.body.as_bytes();
        let length = MIN_PACKET_LEN + body.len() as i32;
        let mut buf = Vec::with_capacity(4 + length as usize);
        buf.extend_from_slice(&length.to_le_bytes());
        buf.extend_from_slice(&self.id.to_le_bytes());
        buf.extend_from_slice(&self.kind.to_wire().to_le_bytes());
        buf.extend_from_slice(body);
        buf.extend_from_slice(&[0, 0]);
        buf
    }

    /// Write the packet to `writer` and flush.
    pub async fn write_to<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.encode()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Read one server packet from `reader`.
    ///
    /// Returns `RconError::Closed` on a clean EOF before the first byte.
    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self> {
        let mut len_buf = [0u8; 4];
        match reader.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(RconError::Closed)
            }
            Err(e) => return Err(e.into()),
        }
        let length = i32::from_le_bytes(len_buf);
        if !(MIN_PACKET_LEN..=MAX_PACKET_LEN).contains(&length) {
            return Err(RconError::Malformed(format!(
                "packet length {} out of range",
                length
            )));
        }

        let mut rest = vec![0u8; length as usize];
        reader.read_exact(&mut rest).await?;

        let id = i32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]);
        let kind = i32::from_le_bytes([rest[4], rest[5], rest[6], rest[7]]);
        if rest[rest.len() - 2..] != [0, 0] {
            return Err(RconError::Malformed("missing packet terminator".to_string()));
        }
        let body = String::from_utf8_lossy(&rest[8..rest.len() - 2]).into_owned();

        Ok(Self {
            id,
            kind: PacketType::from_server(kind),
            body,
        })
    }
}
