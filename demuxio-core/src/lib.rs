//! # demuxio-core
//!
//! Core types for the demuxio container library.
//!
//! This crate provides the building blocks shared by the container
//! backends and their consumers:
//! - Error handling types
//! - Bitstream reading/writing utilities (Exp-Golomb, start codes)
//! - Packet and timestamp abstractions

pub mod bitstream;
pub mod error;
pub mod packet;
pub mod rational;
pub mod timestamp;

pub use error::{Error, Result};
pub use packet::{OwnedPacket, Packet, PacketFlags};
pub use rational::Rational;
pub use timestamp::{Duration, TimeBase, Timestamp};
