//! Descriptor tables of the emulated portal.
//!
//! The tables are built once, from typed descriptors, the first time they
//! are used, and are read-only afterwards.

use std::cmp::min;
use std::mem::size_of;

use bytemuck::bytes_of;
use log::{debug, warn};
use once_cell::sync::Lazy;

use crate::usb::{
    BCDVersion,
    ConfigDescriptor,
    DescriptorType,
    DeviceDescriptor,
    Direction,
    EndpointAddr,
    EndpointAttr,
    EndpointDescriptor,
    EndpointType,
    HidDescriptor,
    InterfaceDescriptor,
    InterfaceNum,
    StringId,
};

const VENDOR_ID: u16 = 0x1430;
const PRODUCT_ID: u16 = 0x0150;
const LANGUAGE_EN_US: u16 = 0x0409;
const MANUFACTURER: &str = "Activision";
const PRODUCT: &str = "Spyro Porta";
const INTERFACE_CLASS_HID: u8 = 0x03;
const MAX_PACKET_SIZE: u16 = 0x20;

const REPORT_DESCRIPTOR: [u8; 29] = [
    0x06, 0x00, 0xff,  // Usage Page (Vendor Defined 0xFF00)
    0x09, 0x01,        // Usage (0x01)
    0xa1, 0x01,        // Collection (Application)
    0x19, 0x01,        //   Usage Minimum (0x01)
    0x29, 0x40,        //   Usage Maximum (0x40)
    0x15, 0x00,        //   Logical Minimum (0)
    0x26, 0xff, 0x00,  //   Logical Maximum (255)
    0x75, 0x08,        //   Report Size (8)
    0x95, 0x20,        //   Report Count (32)
    0x81, 0x00,        //   Input (Data, Array, Absolute)
    0x19, 0x01,        //   Usage Minimum (0x01)
    0x29, 0x40,        //   Usage Maximum (0x40)
    0x91, 0x00,        //   Output (Data, Array, Absolute)
    0xc0,              // End Collection
];

const DEVICE: DeviceDescriptor = DeviceDescriptor {
    length: size_of::<DeviceDescriptor>() as u8,
    descriptor_type: DescriptorType::Device as u8,
    usb_version: BCDVersion { major: 0x02, minor: 0x00 },
    device_class: 0,
    device_subclass: 0,
    device_protocol: 0,
    max_packet_size_0: 64,
    vendor_id: VENDOR_ID.to_le(),
    product_id: PRODUCT_ID.to_le(),
    device_version: BCDVersion { major: 0x01, minor: 0x00 },
    manufacturer_str_id: StringId(1),
    product_str_id: StringId(2),
    serial_str_id: StringId(0),
    num_configurations: 1,
};

const ENDPOINTS: [EndpointDescriptor; 2] = [
    endpoint(EndpointAddr::from_parts(1, Direction::In)),
    endpoint(EndpointAddr::from_parts(1, Direction::Out)),
];

const fn endpoint(address: EndpointAddr) -> EndpointDescriptor {
    EndpointDescriptor {
        length: size_of::<EndpointDescriptor>() as u8,
        descriptor_type: DescriptorType::Endpoint as u8,
        endpoint_address: address,
        attributes: EndpointAttr(EndpointType::Interrupt as u8),
        max_packet_size: MAX_PACKET_SIZE.to_le(),
        interval: 1,
    }
}

const INTERFACE: InterfaceDescriptor = InterfaceDescriptor {
    length: size_of::<InterfaceDescriptor>() as u8,
    descriptor_type: DescriptorType::Interface as u8,
    interface_number: InterfaceNum(0),
    alternate_setting: 0,
    num_endpoints: ENDPOINTS.len() as u8,
    interface_class: INTERFACE_CLASS_HID,
    interface_subclass: 0,
    interface_protocol: 0,
    interface_str_id: StringId(0),
};

const HID: HidDescriptor = HidDescriptor {
    length: size_of::<HidDescriptor>() as u8,
    descriptor_type: DescriptorType::Hid as u8,
    hid_version: BCDVersion { major: 0x01, minor: 0x11 },
    country_code: 0,
    num_descriptors: 1,
    report_descriptor_type: DescriptorType::Report as u8,
    report_descriptor_length: (REPORT_DESCRIPTOR.len() as u16).to_le(),
};

const CONFIG_TOTAL_LENGTH: usize =
    size_of::<ConfigDescriptor>() +
    size_of::<InterfaceDescriptor>() +
    size_of::<HidDescriptor>() +
    size_of::<EndpointDescriptor>() * ENDPOINTS.len();

const CONFIG: ConfigDescriptor = ConfigDescriptor {
    length: size_of::<ConfigDescriptor>() as u8,
    descriptor_type: DescriptorType::Configuration as u8,
    total_length: (CONFIG_TOTAL_LENGTH as u16).to_le(),
    num_interfaces: 1,
    config_value: 1,
    config_str_id: StringId(0),
    attributes: 0x80,
    max_power: 0x96,
};

/// The portal's descriptors, built on first use.
pub static PORTAL: Lazy<DescriptorStore> = Lazy::new(DescriptorStore::portal);

/// A named, immutable descriptor byte table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Table {
    name: &'static str,
    bytes: Vec<u8>,
}

impl Table {
    pub fn new(name: &'static str, bytes: Vec<u8>) -> Self {
        Table { name, bytes }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The first `size` bytes of the table, or the whole table if it is
    /// shorter than that.
    pub fn slice(&self, size: usize) -> &[u8] {
        let length = min(size, self.bytes.len());
        if length < size {
            debug!("Requested {size} bytes of {} descriptor, clamped to {length}",
                   self.name);
        }
        &self.bytes[..length]
    }
}

pub struct DescriptorStore {
    pub device: Table,
    pub endpoints: Table,
    pub configuration: Table,
    pub strings: Vec<Table>,
    pub report: Table,
}

impl DescriptorStore {
    /// Build the tables for the emulated portal.
    pub fn portal() -> Self {
        let mut configuration = Vec::with_capacity(CONFIG_TOTAL_LENGTH);
        configuration.extend_from_slice(bytes_of(&CONFIG));
        configuration.extend_from_slice(bytes_of(&INTERFACE));
        configuration.extend_from_slice(bytes_of(&HID));
        for endpoint in &ENDPOINTS {
            configuration.extend_from_slice(bytes_of(endpoint));
        }

        DescriptorStore {
            device: Table::new("device", bytes_of(&DEVICE).to_vec()),
            endpoints: Table::new("endpoint", endpoint_block(&ENDPOINTS)),
            configuration: Table::new("configuration", configuration),
            strings: vec![
                Table::new("language", language_descriptor(&[LANGUAGE_EN_US])),
                Table::new("manufacturer", string_descriptor(MANUFACTURER)),
                Table::new("product", string_descriptor(PRODUCT)),
            ],
            report: Table::new("report", REPORT_DESCRIPTOR.to_vec()),
        }
    }

    /// Device descriptor followed by the endpoint block the bridge uses to
    /// set up its own endpoints.
    pub fn device_reply(&self) -> Vec<u8> {
        [self.device.bytes(), self.endpoints.bytes()].concat()
    }

    /// String descriptor by index, with index 0 being the language table.
    ///
    /// An index past the end of the table yields an empty descriptor.
    pub fn string(&self, index: u8) -> &[u8] {
        match self.strings.get(index as usize) {
            Some(table) => table.bytes(),
            None => {
                warn!("No string descriptor #{index}, sending an empty one");
                &[]
            }
        }
    }
}

/// Endpoint configuration appended to the device descriptor: a count, then
/// per endpoint its address, type, and max packet size low and high bytes.
/// This is not a USB descriptor; only the bridge consumes it.
fn endpoint_block(endpoints: &[EndpointDescriptor]) -> Vec<u8> {
    let mut block = Vec::with_capacity(1 + 4 * endpoints.len());
    block.push(endpoints.len() as u8);
    for endpoint in endpoints {
        block.push(endpoint.endpoint_address.0);
        block.push(endpoint.attributes.endpoint_type().into());
        block.extend_from_slice(&endpoint.max_packet_size().to_le_bytes());
    }
    block
}

fn string_descriptor(text: &str) -> Vec<u8> {
    let mut descriptor = vec![0, DescriptorType::String as u8];
    for unit in text.encode_utf16() {
        descriptor.extend_from_slice(&unit.to_le_bytes());
    }
    descriptor[0] = descriptor.len() as u8;
    descriptor
}

fn language_descriptor(languages: &[u16]) -> Vec<u8> {
    let mut descriptor = vec![0, DescriptorType::String as u8];
    for language in languages {
        descriptor.extend_from_slice(&language.to_le_bytes());
    }
    descriptor[0] = descriptor.len() as u8;
    descriptor
}
