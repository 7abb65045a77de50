//! In-memory transport for driving the portal from tests.

use std::collections::VecDeque;
use std::io::{self, ErrorKind};

use crate::packet::Packet;
use crate::transport::Transport;

#[derive(Default)]
pub struct ScriptedTransport {
    input: VecDeque<u8>,
    pub output: Vec<u8>,
}

impl ScriptedTransport {
    pub fn new(input: &[u8]) -> Self {
        ScriptedTransport {
            input: input.iter().copied().collect(),
            output: Vec::new(),
        }
    }

    /// A transport whose input is the given packets, framed.
    pub fn with_packets(packets: &[Packet]) -> Self {
        let mut input = Vec::new();
        for packet in packets {
            input.extend(packet.encode().unwrap());
        }
        ScriptedTransport::new(&input)
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.input.extend(bytes);
    }

    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    /// Split everything written so far back into packets.
    pub fn written_packets(&self) -> Vec<Packet> {
        let mut packets = Vec::new();
        let mut rest = self.output.as_slice();
        while rest.len() >= 2 {
            let length = u16::from_le_bytes([rest[0], rest[1]]) as usize;
            let (body, tail) = rest[2..].split_at(length);
            packets.push(Packet::decode(rest[0], rest[1], body).unwrap());
            rest = tail;
        }
        assert!(rest.is_empty(), "Trailing bytes in output: {rest:02x?}");
        packets
    }
}

impl Transport for ScriptedTransport {
    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.input.len())
    }

    fn read_exact(&mut self, count: usize) -> io::Result<Vec<u8>> {
        if self.input.len() < count {
            return Err(ErrorKind::UnexpectedEof.into());
        }
        Ok(self.input.drain(..count).collect())
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.output.extend_from_slice(bytes);
        Ok(())
    }
}
