#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod adc;
pub mod configuration;
pub mod dds;
pub mod design_parameters;
pub mod iir;
pub mod servo;
pub mod sim;
mod tools;
pub use tools::*;

pub use configuration::{Error, ServoConfig};
pub use servo::Servo;
