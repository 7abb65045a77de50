//! Framing of packets on the serial link to the bridge.
//!
//! Each frame is a little-endian 16-bit length, followed by that many bytes:
//! a one byte command and its payload.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::Error;
use crate::util::HexDump;

/// Number of length bytes ahead of every frame.
pub const HEADER_LEN: usize = 2;

/// Two byte little-endian integer.
pub fn tbint(low: u8, high: u8) -> u16 {
    u16::from_le_bytes([low, high])
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Command {
    /// 'F': connection state change, payload 0x01 connected, 0x00 not.
    Event = 0x46,
    /// 'U': a control request forwarded from the host.
    UsbRequest = 0x55,
    /// 'D': descriptor request inbound, descriptor data outbound.
    Descriptor = 0x44,
    /// 'S': status reply.
    Status = 0x53,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub command: Command,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn new(command: Command, payload: impl Into<Vec<u8>>) -> Self {
        Packet {
            command,
            payload: payload.into(),
        }
    }

    /// Decode a frame whose length bytes have already been read.
    ///
    /// `raw` must hold exactly the number of bytes the length declares.
    pub fn decode(len_lo: u8, len_hi: u8, raw: &[u8]) -> Result<Packet, Error> {
        let declared = tbint(len_lo, len_hi) as usize;
        match raw.split_first() {
            Some((&command, payload)) if raw.len() == declared => {
                let command = Command::try_from(command)
                    .map_err(|e| Error::UnknownCommand(e.number))?;
                Ok(Packet::new(command, payload))
            },
            _ => Err(Error::MalformedFrame {
                declared,
                actual: raw.len(),
            }),
        }
    }

    /// Encode this packet as a complete frame, length bytes included.
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let length = u16::try_from(self.payload.len() + 1)
            .map_err(|_| Error::Oversized(self.payload.len()))?;
        let mut frame = Vec::with_capacity(HEADER_LEN + length as usize);
        frame.extend_from_slice(&length.to_le_bytes());
        frame.push(self.command.into());
        frame.extend_from_slice(&self.payload);
        Ok(frame)
    }

    /// The command byte and payload, as they appear after the length.
    pub fn body(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(self.payload.len() + 1);
        body.push(self.command.into());
        body.extend_from_slice(&self.payload);
        body
    }
}

impl std::fmt::Display for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", HexDump(&self.body()))
    }
}
