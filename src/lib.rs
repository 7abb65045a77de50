#[macro_use]
extern crate bitfield;

pub mod descriptors;
mod error;
pub mod event;
pub mod packet;
pub mod portal;
pub mod responder;
pub mod settings;
pub mod transport;
pub mod usb;
pub mod util;

#[cfg(test)]
mod testing;

pub use error::Error;
