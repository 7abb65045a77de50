//! Classification of inbound packets into typed events.

use crate::error::Error;
use crate::packet::{Command, Packet, tbint};
use crate::usb::{ControlRequest, DescriptorType};

/// Payload length of a descriptor request that carries a requested size.
const SIZED_REQUEST_LEN: usize = 6;

/// A descriptor the bridge asks for on the host's behalf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DescriptorRequest {
    Device,
    DeviceQualifier,
    Configuration { size: u16 },
    String { index: u8 },
    Report { size: u16 },
}

impl DescriptorRequest {
    /// Decode the payload of a 'D' packet.
    ///
    /// The payload starts with the string index and the descriptor type.
    /// A payload of exactly six bytes ends with the requested size, little
    /// endian; without it the requested size is zero.
    pub fn from_payload(payload: &[u8]) -> Result<Self, Error> {
        let (index, kind) = match payload {
            [index, kind, ..] => (*index, *kind),
            _ => return Err(Error::Truncated {
                what: "descriptor request",
                expected: 2,
                actual: payload.len(),
            }),
        };
        let size = match payload.len() {
            SIZED_REQUEST_LEN => tbint(payload[4], payload[5]),
            _ => 0,
        };
        use DescriptorType::*;
        match DescriptorType::from(kind) {
            Device => Ok(DescriptorRequest::Device),
            DeviceQualifier => Ok(DescriptorRequest::DeviceQualifier),
            Configuration => Ok(DescriptorRequest::Configuration { size }),
            String => Ok(DescriptorRequest::String { index }),
            Report => Ok(DescriptorRequest::Report { size }),
            _ => Err(Error::UnclassifiedDescriptor(kind)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Connected,
    Disconnected,
    Descriptor(DescriptorRequest),
    Control(ControlRequest),
}

impl Event {
    pub fn from_packet(packet: &Packet) -> Result<Self, Error> {
        match packet.command {
            Command::Event => match packet.payload.first() {
                Some(0x01) => Ok(Event::Connected),
                Some(0x00) => Ok(Event::Disconnected),
                Some(&other) => Err(Error::UnclassifiedEvent(other)),
                None => Err(Error::Truncated {
                    what: "connection event",
                    expected: 1,
                    actual: 0,
                }),
            },
            Command::Descriptor =>
                DescriptorRequest::from_payload(&packet.payload)
                    .map(Event::Descriptor),
            Command::UsbRequest =>
                ControlRequest::from_bytes(&packet.payload)
                    .map(Event::Control),
            Command::Status => Err(Error::UnclassifiedPacket(packet.command)),
        }
    }

    /// The command byte the event arrived with.
    pub fn command(&self) -> Command {
        match self {
            Event::Connected | Event::Disconnected => Command::Event,
            Event::Descriptor(_) => Command::Descriptor,
            Event::Control(_) => Command::UsbRequest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(command: Command, payload: &[u8]) -> Result<Event, Error> {
        Event::from_packet(&Packet::new(command, payload))
    }

    #[test]
    fn test_connection_events() {
        assert_eq!(event(Command::Event, &[0x01]).unwrap(), Event::Connected);
        assert_eq!(event(Command::Event, &[0x00]).unwrap(), Event::Disconnected);
        assert!(matches!(event(Command::Event, &[0x02]),
                         Err(Error::UnclassifiedEvent(0x02))));
        assert!(matches!(event(Command::Event, &[]),
                         Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_sized_descriptor_request() {
        // 44 00 01 00 00 09 00: device descriptor, 9 bytes requested.
        let payload = [0x00, 0x01, 0x00, 0x00, 0x09, 0x00];
        assert_eq!(DescriptorRequest::from_payload(&payload).unwrap(),
                   DescriptorRequest::Device);
        let payload = [0x00, 0x02, 0x00, 0x00, 0x09, 0x00];
        assert_eq!(DescriptorRequest::from_payload(&payload).unwrap(),
                   DescriptorRequest::Configuration { size: 9 });
        let payload = [0x00, 0x22, 0x00, 0x00, 0x1d, 0x01];
        assert_eq!(DescriptorRequest::from_payload(&payload).unwrap(),
                   DescriptorRequest::Report { size: 0x11d });
    }

    #[test]
    fn test_unsized_descriptor_request() {
        let payload = [0x00, 0x02, 0x00, 0x00, 0x09];
        assert_eq!(DescriptorRequest::from_payload(&payload).unwrap(),
                   DescriptorRequest::Configuration { size: 0 });
        let payload = [0x00, 0x02, 0x00, 0x00, 0x09, 0x00, 0x00];
        assert_eq!(DescriptorRequest::from_payload(&payload).unwrap(),
                   DescriptorRequest::Configuration { size: 0 });
    }

    #[test]
    fn test_string_descriptor_request() {
        assert_eq!(event(Command::Descriptor, &[0x02, 0x03]).unwrap(),
                   Event::Descriptor(DescriptorRequest::String { index: 2 }));
    }

    #[test]
    fn test_qualifier_descriptor_request() {
        assert_eq!(event(Command::Descriptor, &[0x00, 0x06, 0x00, 0x00, 0x0a, 0x00]).unwrap(),
                   Event::Descriptor(DescriptorRequest::DeviceQualifier));
    }

    #[test]
    fn test_unclassified_descriptor() {
        assert!(matches!(event(Command::Descriptor, &[0x00, 0x21]),
                         Err(Error::UnclassifiedDescriptor(0x21))));
        assert!(matches!(event(Command::Descriptor, &[0x00, 0x0f]),
                         Err(Error::UnclassifiedDescriptor(0x0f))));
        assert!(matches!(event(Command::Descriptor, &[0x00]),
                         Err(Error::Truncated { expected: 2, actual: 1, .. })));
    }

    #[test]
    fn test_control_request() {
        let setup = [0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x40, 0x00];
        match event(Command::UsbRequest, &setup).unwrap() {
            Event::Control(request) => {
                assert!(request.is_device_descriptor_request());
                assert_eq!(request.length, 0x40);
            },
            other => panic!("Expected Control but got {:?}", other),
        }
        assert!(matches!(event(Command::UsbRequest, &setup[..4]),
                         Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_event_command() {
        for (command, payload) in [
            (Command::Event, vec![0x01]),
            (Command::Event, vec![0x00]),
            (Command::Descriptor, vec![0x01, 0x03]),
            (Command::UsbRequest, vec![0x00, 0x05, 0x64, 0x00, 0x00, 0x00, 0x00, 0x00]),
        ] {
            assert_eq!(event(command, &payload).unwrap().command(), command);
        }
    }

    #[test]
    fn test_inbound_status() {
        assert!(matches!(event(Command::Status, &[0x00]),
                         Err(Error::UnclassifiedPacket(Command::Status))));
    }
}
