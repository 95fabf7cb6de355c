//! # pylon-core
//!
//! Foundation types for the pylon relay hub: the tagged binary wire
//! protocol (opcodes, presence notices, room commands), inbound frame
//! classification, and branded connection IDs.
//!
//! This crate does no I/O — it only describes what the bytes mean.

#![deny(unsafe_code)]

pub mod ids;
pub mod protocol;

pub use ids::ConnectionId;
pub use protocol::{Inbound, Notice, RoomCommand};
