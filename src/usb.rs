//! USB types: setup packets as forwarded by the bridge, and the standard
//! descriptor layouts used to build the emulated device.

use bytemuck_derive::{Pod, Zeroable};
use num_enum::{IntoPrimitive, FromPrimitive};
use derive_more::{From, Into};

use crate::error::Error;
use crate::util::fmt_bytes;

/// Length of a setup packet header.
pub const SETUP_LEN: usize = 8;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default,
         Pod, Zeroable, From, Into)]
#[repr(transparent)]
pub struct StringId(pub u8);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default,
         Pod, Zeroable, From, Into)]
#[repr(transparent)]
pub struct InterfaceNum(pub u8);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default,
         Pod, Zeroable, From, Into)]
#[repr(transparent)]
pub struct EndpointAddr(pub u8);

impl EndpointAddr {
    pub const fn from_parts(number: u8, direction: Direction) -> Self {
        EndpointAddr((direction as u8) << 7 | number & 0x7F)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default,
         Pod, Zeroable, From, Into)]
#[repr(transparent)]
pub struct EndpointAttr(pub u8);

impl EndpointAttr {
    pub fn endpoint_type(&self) -> EndpointType {
        EndpointType::from(self.0 & 0x03)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum EndpointType {
    #[default]
    Control     = 0,
    Isochronous = 1,
    Bulk        = 2,
    Interrupt   = 3,
}

#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
#[repr(C)]
pub struct BCDVersion {
    pub minor: u8,
    pub major: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum RequestType {
    Standard = 0,
    Class = 1,
    Vendor = 2,
    #[default]
    Reserved = 3,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum Recipient {
    Device = 0,
    Interface = 1,
    Endpoint = 2,
    Other = 3,
    #[default]
    Reserved = 4,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Direction {
    #[default]
    Out = 0,
    In = 1,
}

bitfield! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct RequestTypeFields(u8);
    pub u8, into Recipient, recipient, _: 4, 0;
    pub u8, into RequestType, request_type, _: 6, 5;
    pub u8, into Direction, direction, _: 7, 7;
}

impl RequestTypeFields {
    pub fn bits(&self) -> u8 {
        self.0
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum StandardRequest {
    GetStatus = 0,
    ClearFeature = 1,
    SetFeature = 3,
    SetAddress = 5,
    GetDescriptor = 6,
    SetDescriptor = 7,
    GetConfiguration = 8,
    SetConfiguration = 9,
    GetInterface = 10,
    SetInterface = 11,
    SynchFrame = 12,
    #[default]
    Unknown = 13,
}

/// Name of a standard request code, as shown in request dumps.
pub fn request_name(code: u8) -> Option<&'static str> {
    const NAMES: [&str; 13] = [
        "GET_STATUS",
        "CLEAR_FEATURE",
        "Reserved",
        "SET_FEATURE",
        "Reserved",
        "SET_ADDRESS",
        "GET_DESCRIPTOR",
        "SET_DESCRIPTOR",
        "GET_CONFIGURATION",
        "SET_CONFIGURATION",
        "GET_INTERFACE",
        "SET_INTERFACE",
        "SYNC FRAME",
    ];
    NAMES.get(code as usize).copied()
}

#[derive(Copy, Clone, Debug, FromPrimitive, PartialEq, Eq)]
#[repr(u8)]
pub enum DescriptorType {
    Device = 0x01,
    Configuration = 0x02,
    String = 0x03,
    Interface = 0x04,
    Endpoint = 0x05,
    DeviceQualifier = 0x06,
    OtherSpeedConfiguration = 0x07,
    InterfacePower = 0x08,
    Hid = 0x21,
    Report = 0x22,
    #[default]
    Unknown = 0xFF,
}

#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
#[repr(C)]
pub struct DeviceDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub usb_version: BCDVersion,
    pub device_class: u8,
    pub device_subclass: u8,
    pub device_protocol: u8,
    pub max_packet_size_0: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub device_version: BCDVersion,
    pub manufacturer_str_id: StringId,
    pub product_str_id: StringId,
    pub serial_str_id: StringId,
    pub num_configurations: u8
}

#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
#[repr(C, packed)]
pub struct ConfigDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub total_length: u16,
    pub num_interfaces: u8,
    pub config_value: u8,
    pub config_str_id: StringId,
    pub attributes: u8,
    pub max_power: u8
}

#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
#[repr(C, packed)]
pub struct InterfaceDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub interface_number: InterfaceNum,
    pub alternate_setting: u8,
    pub num_endpoints: u8,
    pub interface_class: u8,
    pub interface_subclass: u8,
    pub interface_protocol: u8,
    pub interface_str_id: StringId,
}

/// HID class descriptor, with a single subordinate descriptor entry.
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
#[repr(C, packed)]
pub struct HidDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub hid_version: BCDVersion,
    pub country_code: u8,
    pub num_descriptors: u8,
    pub report_descriptor_type: u8,
    pub report_descriptor_length: u16,
}

#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
#[repr(C, packed)]
pub struct EndpointDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub endpoint_address: EndpointAddr,
    pub attributes: EndpointAttr,
    pub max_packet_size: u16,
    pub interval: u8,
}

impl EndpointDescriptor {
    pub fn max_packet_size(&self) -> u16 {
        let size: u16 = self.max_packet_size;
        u16::from_le(size)
    }
}

/// A control request as forwarded by the bridge.
///
/// The bridge passes `wValue` and `wIndex` with their two bytes swapped
/// relative to the little-endian order of a USB setup packet, while
/// `wLength` arrives in wire order. Parsing reproduces exactly that.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlRequest {
    pub type_fields: RequestTypeFields,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
    pub data: Vec<u8>,
}

impl ControlRequest {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < SETUP_LEN {
            return Err(Error::Truncated {
                what: "setup packet",
                expected: SETUP_LEN,
                actual: bytes.len(),
            });
        }
        Ok(ControlRequest {
            type_fields: RequestTypeFields(bytes[0]),
            request: bytes[1],
            value: u16::from_be_bytes([bytes[2], bytes[3]]),
            index: u16::from_be_bytes([bytes[4], bytes[5]]),
            length: u16::from_le_bytes([bytes[6], bytes[7]]),
            data: bytes[SETUP_LEN..].to_vec(),
        })
    }

    /// The request in the bridge's wire order, trailing data included.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SETUP_LEN + self.data.len());
        bytes.push(self.type_fields.bits());
        bytes.push(self.request);
        bytes.extend_from_slice(&self.value.to_be_bytes());
        bytes.extend_from_slice(&self.index.to_be_bytes());
        bytes.extend_from_slice(&self.length.to_le_bytes());
        bytes.extend_from_slice(&self.data);
        bytes
    }

    pub fn standard_request(&self) -> StandardRequest {
        StandardRequest::from(self.request)
    }

    /// Device-to-host requests and requests without a data stage are
    /// acknowledged without further handling.
    pub fn can_ignore(&self) -> bool {
        self.type_fields.direction() == Direction::In || self.length == 0
    }

    pub fn is_descriptor_request(&self) -> bool {
        self.standard_request() == StandardRequest::GetDescriptor
    }

    pub fn is_device_descriptor_request(&self) -> bool {
        self.is_descriptor_request() &&
            self.value == DescriptorType::Device as u16
    }

    pub fn is_device_qualifier_descriptor_request(&self) -> bool {
        self.is_descriptor_request() &&
            self.value == DescriptorType::DeviceQualifier as u16
    }

    pub fn is_configuration_descriptor_request(&self) -> bool {
        self.is_descriptor_request() &&
            self.value == DescriptorType::Configuration as u16
    }

    /// One line description, for error messages.
    pub fn summary(&self) -> String {
        let name = request_name(self.request)
            .map_or_else(|| format!("request 0x{:02x}", self.request),
                         str::to_string);
        format!("{} {:?} {:?} to {:?}, value 0x{:04x}, index 0x{:04x}, length {}",
            name,
            self.type_fields.request_type(),
            self.type_fields.direction(),
            self.type_fields.recipient(),
            self.value,
            self.index,
            self.length)
    }
}

impl std::fmt::Display for ControlRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let wire = self.to_bytes();
        let request_type = self.type_fields.bits();
        writeln!(f, "bmRequestType: {request_type:02x} {request_type:#b}")?;
        match request_name(self.request) {
            Some(name) => writeln!(f, "bRequest: {:02x} ({name})", self.request)?,
            None => writeln!(f, "bRequest: {:02x}", self.request)?,
        }
        writeln!(f, "wValue: {:02x}{:02x}", wire[2], wire[3])?;
        writeln!(f, "wIndex: {:02x}{:02x}", wire[4], wire[5])?;
        writeln!(f, "wLength: {:02x}{:02x}", wire[6], wire[7])?;
        write!(f, "data: {}", fmt_bytes(&self.data))
    }
}
