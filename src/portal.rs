//! The emulated portal: reads packets from the bridge and answers them.

use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::sleep;

use log::{debug, info};

use crate::error::Error;
use crate::event::Event;
use crate::packet::{HEADER_LEN, Packet, tbint};
use crate::responder::{Responder, disconnect_packet};
use crate::transport::{POLL_INTERVAL, Transport};

pub struct Portal<'s, T: Transport> {
    transport: T,
    responder: Responder<'s>,
}

impl<'s, T: Transport> Portal<'s, T> {
    pub fn new(transport: T, responder: Responder<'s>) -> Self {
        Portal {
            transport,
            responder,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn responder(&self) -> &Responder<'s> {
        &self.responder
    }

    /// Whether there are enough bytes waiting to start reading a packet.
    pub fn is_packet_available(&mut self) -> Result<bool, Error> {
        Ok(self.transport.bytes_available()? >= HEADER_LEN)
    }

    /// Read the next packet. Only call this when a packet is available.
    pub fn next_packet(&mut self) -> Result<Packet, Error> {
        let header = self.transport.read_exact(HEADER_LEN)?;
        let declared = tbint(header[0], header[1]) as usize;
        let body = match self.transport.read_exact(declared) {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(Error::MalformedFrame {
                    declared,
                    actual: self.transport.bytes_available()?,
                });
            },
            Err(e) => return Err(e.into()),
        };
        let packet = Packet::decode(header[0], header[1], &body)?;
        debug!("< {packet}");
        Ok(packet)
    }

    pub fn send(&mut self, packet: &Packet) -> Result<(), Error> {
        let frame = packet.encode()?;
        debug!("> {packet}");
        self.transport.write_all(&frame)?;
        Ok(())
    }

    /// Handle one packet, if one is waiting. Returns whether it did.
    pub fn poll(&mut self) -> Result<bool, Error> {
        if !self.is_packet_available()? {
            return Ok(false);
        }
        let packet = self.next_packet()?;
        let event = Event::from_packet(&packet)?;
        if let Some(reply) = self.responder.respond(&event)? {
            self.send(&reply)?;
        }
        Ok(true)
    }

    /// Handle packets until something goes wrong or `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool) -> Result<(), Error> {
        while running.load(Ordering::SeqCst) {
            if !self.poll()? {
                sleep(POLL_INTERVAL);
            }
        }
        Ok(())
    }

    /// Tell the bridge to detach the emulated device.
    pub fn disconnect(&mut self) -> Result<(), Error> {
        info!("Disconnecting");
        self.send(&disconnect_packet())
    }
}
