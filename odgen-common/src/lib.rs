//! Common functionality shared among the odgen crates.
//!
//! This crate holds the device description model read by the object dictionary compiler in
//! `odgen-build`, along with the basic CANopen enumerations used to describe objects.
#![warn(missing_docs, missing_copy_implementations)]

pub mod device_description;
pub mod objects;

pub use device_description::{DeviceDescription, LoadError};
