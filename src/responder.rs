//! Decides the reply to every inbound event during enumeration.

use log::{debug, info};
use num_enum::{FromPrimitive, IntoPrimitive};

use crate::descriptors::DescriptorStore;
use crate::error::Error;
use crate::event::{DescriptorRequest, Event};
use crate::packet::{Command, Packet};
use crate::usb::ControlRequest;
use crate::util::fmt_hex;

/// Status byte of an acknowledgement.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Ack {
    /// The bridge completes the request itself.
    #[default]
    Ignore = 0x00,
    /// The request is handled here. Not used during enumeration.
    Handle = 0x01,
    /// The bridge stalls the request.
    Stall = 0x02,
}

/// Status payload of the reply to a connection event.
const CONNECTED: u8 = 0x01;
const DISCONNECTED: u8 = 0x00;

#[derive(Copy, Clone, Debug, Default)]
pub struct ResponderOptions {
    /// Stall device qualifier requests, as a full speed only device
    /// should, rather than letting the bridge ignore them.
    pub stall_device_qualifier: bool,
}

pub struct Responder<'s> {
    store: &'s DescriptorStore,
    options: ResponderOptions,
    connected: bool,
}

impl<'s> Responder<'s> {
    pub fn new(store: &'s DescriptorStore, options: ResponderOptions) -> Self {
        Responder {
            store,
            options,
            connected: false,
        }
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    /// Work out the reply to an event, if it needs one.
    pub fn respond(&mut self, event: &Event) -> Result<Option<Packet>, Error> {
        match event {
            Event::Connected => {
                info!("Connected event, connecting");
                self.connected = true;
                Ok(Some(connect_packet()))
            },
            Event::Disconnected => {
                info!("Disconnected event, nothing to do");
                self.connected = false;
                Ok(None)
            },
            Event::Descriptor(request) =>
                Ok(Some(self.descriptor(request))),
            Event::Control(request) => {
                let ack = self.control(request)?;
                Ok(Some(acknowledge(event.command(), ack)))
            },
        }
    }

    fn descriptor(&self, request: &DescriptorRequest) -> Packet {
        use DescriptorRequest::*;
        let data = match request {
            DeviceQualifier => {
                info!("Sending empty device qualifier descriptor");
                Vec::new()
            },
            String { index } => {
                info!("Sending string descriptor #{index}");
                self.store.string(*index).to_vec()
            },
            Device => {
                info!("Sending device descriptor");
                self.store.device_reply()
            },
            Configuration { size } => {
                info!("Sending configuration descriptor, {size} bytes requested");
                self.store.configuration.slice(*size as usize).to_vec()
            },
            Report { size } => {
                info!("Sending report descriptor, {size} bytes requested");
                self.store.report.slice(*size as usize).to_vec()
            },
        };
        debug!("{}", fmt_hex(&data));
        Packet::new(Command::Descriptor, data)
    }

    fn control(&self, request: &ControlRequest) -> Result<Ack, Error> {
        for line in request.to_string().lines() {
            debug!("\t{line}");
        }
        if request.is_descriptor_request() {
            if request.is_device_descriptor_request() ||
                request.is_configuration_descriptor_request()
            {
                Ok(Ack::Ignore)
            } else if request.is_device_qualifier_descriptor_request() {
                Ok(if self.options.stall_device_qualifier {
                    Ack::Stall
                } else {
                    Ack::Ignore
                })
            } else if request.can_ignore() {
                info!("Ignoring descriptor request");
                Ok(Ack::Ignore)
            } else {
                Err(Error::UnclassifiedRequest(request.clone()))
            }
        } else if request.can_ignore() {
            info!("Ignoring other request");
            Ok(Ack::Ignore)
        } else {
            Err(Error::UnclassifiedRequest(request.clone()))
        }
    }
}

/// Acknowledge a control request. The reply carries the command byte of
/// the request and a single status byte.
pub fn acknowledge(command: Command, ack: Ack) -> Packet {
    info!("Acknowledging: {:?}", ack);
    Packet::new(command, vec![ack.into()])
}

pub fn connect_packet() -> Packet {
    Packet::new(Command::Status, vec![CONNECTED])
}

pub fn disconnect_packet() -> Packet {
    Packet::new(Command::Status, vec![DISCONNECTED])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::PORTAL;

    fn responder() -> Responder<'static> {
        Responder::new(&PORTAL, ResponderOptions::default())
    }

    fn control(setup: &[u8]) -> Event {
        Event::Control(ControlRequest::from_bytes(setup).unwrap())
    }

    fn descriptor(request: DescriptorRequest) -> Event {
        Event::Descriptor(request)
    }

    #[test]
    fn test_connect() {
        let mut responder = responder();
        assert!(!responder.connected());
        let reply = responder.respond(&Event::Connected).unwrap().unwrap();
        assert_eq!(reply.encode().unwrap(), vec![0x02, 0x00, 0x53, 0x01]);
        assert!(responder.connected());
    }

    #[test]
    fn test_disconnect() {
        let mut responder = responder();
        responder.respond(&Event::Connected).unwrap();
        assert_eq!(responder.respond(&Event::Disconnected).unwrap(), None);
        assert!(!responder.connected());
    }

    #[test]
    fn test_device_descriptor() {
        let reply = responder()
            .respond(&descriptor(DescriptorRequest::Device))
            .unwrap().unwrap();
        assert_eq!(reply.command, Command::Descriptor);
        assert_eq!(reply.payload, PORTAL.device_reply());
        assert_eq!(reply.payload.len(), 18 + 9);
    }

    #[test]
    fn test_device_qualifier_descriptor() {
        let reply = responder()
            .respond(&descriptor(DescriptorRequest::DeviceQualifier))
            .unwrap().unwrap();
        assert_eq!(reply.encode().unwrap(), vec![0x01, 0x00, 0x44]);
    }

    #[test]
    fn test_configuration_descriptor() {
        let mut responder = responder();
        let reply = responder
            .respond(&descriptor(DescriptorRequest::Configuration { size: 9 }))
            .unwrap().unwrap();
        assert_eq!(reply.payload, PORTAL.configuration.bytes()[..9].to_vec());
        let reply = responder
            .respond(&descriptor(DescriptorRequest::Configuration { size: 0xff }))
            .unwrap().unwrap();
        assert_eq!(reply.payload, PORTAL.configuration.bytes().to_vec());
    }

    #[test]
    fn test_report_descriptor() {
        let reply = responder()
            .respond(&descriptor(DescriptorRequest::Report { size: 0x1d }))
            .unwrap().unwrap();
        assert_eq!(reply.payload, PORTAL.report.bytes().to_vec());
    }

    #[test]
    fn test_string_descriptor() {
        let mut responder = responder();
        let reply = responder
            .respond(&descriptor(DescriptorRequest::String { index: 1 }))
            .unwrap().unwrap();
        assert_eq!(reply.payload, PORTAL.strings[1].bytes().to_vec());
        let reply = responder
            .respond(&descriptor(DescriptorRequest::String { index: 9 }))
            .unwrap().unwrap();
        assert!(reply.payload.is_empty());
    }

    #[test]
    fn test_acknowledge_descriptor_requests() {
        let mut responder = responder();
        for setup in [
            [0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x40, 0x00],
            [0x80, 0x06, 0x00, 0x02, 0x00, 0x00, 0x09, 0x00],
            [0x80, 0x06, 0x00, 0x06, 0x00, 0x00, 0x0a, 0x00],
            [0x80, 0x06, 0x03, 0x03, 0x09, 0x04, 0xff, 0x00],
        ] {
            let reply = responder.respond(&control(&setup)).unwrap().unwrap();
            assert_eq!(reply.encode().unwrap(), vec![0x02, 0x00, 0x55, 0x00]);
        }
    }

    #[test]
    fn test_stall_device_qualifier() {
        let options = ResponderOptions { stall_device_qualifier: true };
        let mut responder = Responder::new(&PORTAL, options);
        let setup = [0x80, 0x06, 0x00, 0x06, 0x00, 0x00, 0x0a, 0x00];
        let reply = responder.respond(&control(&setup)).unwrap().unwrap();
        assert_eq!(reply.payload, vec![u8::from(Ack::Stall)]);
        let setup = [0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x40, 0x00];
        let reply = responder.respond(&control(&setup)).unwrap().unwrap();
        assert_eq!(reply.payload, vec![u8::from(Ack::Ignore)]);
    }

    #[test]
    fn test_ignore_set_address() {
        let setup = [0x00, 0x05, 0x64, 0x00, 0x00, 0x00, 0x00, 0x00];
        let reply = responder().respond(&control(&setup)).unwrap().unwrap();
        assert_eq!(reply, Packet::new(Command::UsbRequest, vec![0x00]));
    }

    #[test]
    fn test_unclassified_request() {
        // SET_REPORT to the interface, with a data stage.
        let setup = [0x21, 0x09, 0x00, 0x02, 0x00, 0x00, 0x02, 0x00, 0x01, 0x02];
        match responder().respond(&control(&setup)) {
            Err(Error::UnclassifiedRequest(request)) => {
                assert_eq!(request.request, 0x09);
                assert_eq!(request.data, vec![0x01, 0x02]);
            },
            other => panic!("Expected UnclassifiedRequest but got {:?}", other),
        }
    }

    #[test]
    fn test_unclassified_descriptor_request() {
        // Host-to-device GET_DESCRIPTOR for a string, with a data stage.
        let setup = [0x00, 0x06, 0x00, 0x03, 0x00, 0x00, 0x04, 0x00];
        let err = responder().respond(&control(&setup)).unwrap_err();
        assert!(err.is_unclassified());
    }

    #[test]
    fn test_ack_codes() {
        assert_eq!(u8::from(Ack::Ignore), 0x00);
        assert_eq!(u8::from(Ack::Handle), 0x01);
        assert_eq!(u8::from(Ack::Stall), 0x02);
        assert_eq!(Ack::default(), Ack::Ignore);
        assert_eq!(disconnect_packet().encode().unwrap(), vec![0x02, 0x00, 0x53, 0x00]);
    }

    #[test]
    fn test_acknowledge_echoes_command() {
        let reply = acknowledge(Command::UsbRequest, Ack::Stall);
        assert_eq!(reply.encode().unwrap(), vec![0x02, 0x00, 0x55, 0x02]);
        let reply = acknowledge(Command::Descriptor, Ack::Handle);
        assert_eq!(reply.encode().unwrap(), vec![0x02, 0x00, 0x44, 0x01]);
    }

    #[test]
    fn test_control_reply_uses_request_command() {
        let event = control(&[0x00, 0x05, 0x64, 0x00, 0x00, 0x00, 0x00, 0x00]);
        let reply = responder().respond(&event).unwrap().unwrap();
        assert_eq!(reply.command, event.command());
        assert_eq!(reply.command, Command::UsbRequest);
    }
}
