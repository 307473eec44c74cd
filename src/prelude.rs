//! Prelude
pub use crate::port::ClockGate as _tm4c123x_port_ClockGate;
pub use crate::port::PortRegisters as _tm4c123x_port_PortRegisters;
