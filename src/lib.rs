//! # Pin multiplexer driver for the TM4C123GH6PM
//!
//! The driver walks a post-build configuration table once, programming every
//! port pin's direction, pull resistors, initial level and alternate function,
//! and afterwards allows selected pins to change direction or mode at run time.
//!
//! ```ignore
//! use tm4c123x_port::{pac, port::{Direction, Port, Ports, PORT_CONFIGURATION, PF1}};
//!
//! let mut dp = pac::Peripherals::take().unwrap();
//! let ports = Ports::new(
//!     dp.GPIO_PORTA, dp.GPIO_PORTB, dp.GPIO_PORTC,
//!     dp.GPIO_PORTD, dp.GPIO_PORTE, dp.GPIO_PORTF,
//! );
//! let mut port = Port::init(ports, &mut dp.SYSCTL, &PORT_CONFIGURATION, ());
//! port.set_pin_direction(PF1, Direction::In).ok();
//! ```
#![cfg_attr(not(test), no_std)]

pub use tm4c123x;
pub use tm4c123x as pac;

#[macro_use]
mod fmt;

pub mod diag;
pub mod port;
pub mod prelude;
pub mod shared;
