use thiserror::Error;

use crate::packet::Command;
use crate::usb::ControlRequest;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed frame: {declared} bytes declared, {actual} bytes received")]
    MalformedFrame { declared: usize, actual: usize },

    #[error("truncated {what}: expected at least {expected} bytes, got {actual}")]
    Truncated { what: &'static str, expected: usize, actual: usize },

    #[error("payload of {0} bytes does not fit in a frame")]
    Oversized(usize),

    #[error("unknown command byte 0x{0:02x}")]
    UnknownCommand(u8),

    #[error("unexpected inbound {0:?} packet")]
    UnclassifiedPacket(Command),

    #[error("unclassified connection event 0x{0:02x}")]
    UnclassifiedEvent(u8),

    #[error("unclassified descriptor kind 0x{0:02x}")]
    UnclassifiedDescriptor(u8),

    #[error("unclassified control request: {}", .0.summary())]
    UnclassifiedRequest(ControlRequest),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is inbound traffic the responder has no case for,
    /// as opposed to a broken link or a garbled frame.
    pub fn is_unclassified(&self) -> bool {
        use Error::*;
        matches!(self,
            UnknownCommand(_) |
            UnclassifiedPacket(_) |
            UnclassifiedEvent(_) |
            UnclassifiedDescriptor(_) |
            UnclassifiedRequest(_))
    }
}
