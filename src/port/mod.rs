//! # Port module
//!
//! Pin multiplexer configuration for the six GPIO ports of the TM4C123GH6PM.
//!
//! The module is split the same way the register accesses are layered:
//!
//! - [`pins`]: value-level vocabulary, [`PortId`], [`PinMode`] and the
//!   [`PinConfig`] table entry
//! - [`config`]: the validated post-build table [`PortConfig`] and the board's
//!   [`PORT_CONFIGURATION`]
//! - [`reg`]: the [`PortRegisters`] interface with the register sequences and
//!   the production [`Ports`] backend
//!
//! [`Port`] ties them together. It is created by [`Port::init`] and is the
//! handle for every run-time service.
//!
//! ## Examples
//!
//! ```ignore
//! const TABLE: PortConfig<2> = PortConfig::new([
//!     PinConfig::new(PortId::F, 2).output(Level::High).direction_changeable(false),
//!     PinConfig::new(PortId::B, 6).mode(PinMode::ALT7),
//! ]);
//! let mut port = Port::init(ports, &mut dp.SYSCTL, &TABLE, ());
//! port.set_pin_mode(1, PinMode::ALT1.into())?;
//! ```
pub mod config;
pub use config::*;

pub mod pins;
pub use pins::*;

pub mod reg;
pub use reg::{ClockGate, PortRegisters, Ports, Register};

mod driver;
pub use driver::Port;

#[cfg(test)]
pub(crate) mod mock;
