//! # Post-build configuration set
//!
//! A [`PortConfig`] is an ordered table of [`PinConfig`] entries, one per
//! physical pin. Entries are addressed by their index in the table, which is
//! the pin identifier taken by the run-time services.
//!
//! Tables are normally declared as constants. [`PortConfig::new`] validates in
//! const evaluation, so a duplicate (port, pin) pair or a pin that is not
//! bonded out fails the build:
//!
//! ```compile_fail
//! use tm4c123x_port::port::{PinConfig, PortConfig, PortId};
//! const BAD: PortConfig<2> = PortConfig::new([
//!     PinConfig::new(PortId::A, 0),
//!     PinConfig::new(PortId::A, 0),
//! ]);
//! let _ = BAD.len();
//! ```

use super::pins::{Level, PinConfig, PortId, Resistor};
use crate::diag::Error;
use paste::paste;

/// Index of a pin in the active configuration table
pub type PinIndex = u8;

/// Number of pins on the TM4C123GH6PM package
pub const PORT_NUMBER_OF_PINS: usize = 43;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfig<const N: usize> {
    pins: [PinConfig; N],
}

impl<const N: usize> PortConfig<N> {
    /// Create a validated table
    ///
    /// # Panics
    ///
    /// Panics if [`validate`] rejects the table. In a `const` item this is a
    /// compile error.
    pub const fn new(pins: [PinConfig; N]) -> Self {
        if validate(&pins).is_err() {
            panic!("invalid port configuration: duplicate or non-existent pin");
        }
        PortConfig { pins }
    }

    /// Create a validated table, returning [`Error::ParamConfig`] on an
    /// invalid table
    pub const fn try_new(pins: [PinConfig; N]) -> Result<Self, Error> {
        match validate(&pins) {
            Ok(()) => Ok(PortConfig { pins }),
            Err(e) => Err(e),
        }
    }

    #[inline]
    pub const fn pins(&self) -> &[PinConfig] {
        &self.pins
    }

    #[inline]
    pub const fn len(&self) -> usize {
        N
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Every pin of the package is present in the table
    pub const fn covers_package(&self) -> bool {
        let mut p = 0;
        while p < PortId::ALL.len() {
            let port = PortId::ALL[p];
            let mut pin = 0;
            while pin < port.pin_count() {
                if !contains(&self.pins, port, pin) {
                    return false;
                }
                pin += 1;
            }
            p += 1;
        }
        true
    }
}

/// Check that every entry names a bonded-out pin and that no (port, pin)
/// pair appears twice
pub const fn validate(pins: &[PinConfig]) -> Result<(), Error> {
    let mut i = 0;
    while i < pins.len() {
        let cfg = &pins[i];
        if cfg.pin >= cfg.port.pin_count() {
            return Err(Error::ParamConfig);
        }
        let mut j = i + 1;
        while j < pins.len() {
            if pins[j].port as u8 == cfg.port as u8 && pins[j].pin == cfg.pin {
                return Err(Error::ParamConfig);
            }
            j += 1;
        }
        i += 1;
    }
    Ok(())
}

const fn contains(pins: &[PinConfig], port: PortId, pin: u8) -> bool {
    let mut i = 0;
    while i < pins.len() {
        if pins[i].port as u8 == port as u8 && pins[i].pin == pin {
            return true;
        }
        i += 1;
    }
    false
}

//==================================================================================================
//  Board configuration
//==================================================================================================

macro_rules! board_config {
    (
        $(
            ($Port:ident, $NUM:literal $(, $cfg:ident($arg:expr))*),
        )+
    ) => {
        paste! {
            /// Post-build configuration of the TM4C123G LaunchPad
            ///
            /// Every pin is a changeable digital input without pull resistor,
            /// except the red LED on PF1 (output, low) and the user switch on
            /// PF4 (pulled-up input).
            pub const PORT_CONFIGURATION: PortConfig<PORT_NUMBER_OF_PINS> = PortConfig::new([
                $(
                    PinConfig::new(PortId::$Port, $NUM) $(.$cfg($arg))*,
                )+
            ]);

            board_config!(@index 0u8; $([<P $Port $NUM>],)+);
        }
    };
    (@index $idx:expr; $Id:ident, $($rest:tt)*) => {
        #[doc = concat!("Index of pin ", stringify!($Id), " in [`PORT_CONFIGURATION`]")]
        pub const $Id: PinIndex = $idx;
        board_config!(@index $idx + 1; $($rest)*);
    };
    (@index $idx:expr;) => {};
}

board_config!(
    (A, 0),
    (A, 1),
    (A, 2),
    (A, 3),
    (A, 4),
    (A, 5),
    (A, 6),
    (A, 7),
    (B, 0),
    (B, 1),
    (B, 2),
    (B, 3),
    (B, 4),
    (B, 5),
    (B, 6),
    (B, 7),
    (C, 0),
    (C, 1),
    (C, 2),
    (C, 3),
    (C, 4),
    (C, 5),
    (C, 6),
    (C, 7),
    (D, 0),
    (D, 1),
    (D, 2),
    (D, 3),
    (D, 4),
    (D, 5),
    (D, 6),
    (D, 7),
    (E, 0),
    (E, 1),
    (E, 2),
    (E, 3),
    (E, 4),
    (E, 5),
    (F, 0),
    (F, 1, output(Level::Low)),
    (F, 2),
    (F, 3),
    (F, 4, input(Resistor::PullUp)),
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::pins::{Direction, PinMode};

    #[test]
    fn board_table_covers_package() {
        assert_eq!(PORT_CONFIGURATION.len(), 43);
        assert!(PORT_CONFIGURATION.covers_package());
        assert_eq!(validate(PORT_CONFIGURATION.pins()), Ok(()));
    }

    #[test]
    fn board_table_indices() {
        let pins = PORT_CONFIGURATION.pins();
        assert_eq!(PA0, 0);
        assert_eq!(PB0, 8);
        assert_eq!(PC3, 19);
        assert_eq!(PE5, 37);
        assert_eq!(PF0, 38);
        assert_eq!(PF4, 42);
        let pf1 = &pins[PF1 as usize];
        assert_eq!((pf1.port, pf1.pin), (PortId::F, 1));
        assert_eq!(pf1.direction, Direction::Out);
        assert_eq!(pf1.initial_level, Level::Low);
        let pf4 = &pins[PF4 as usize];
        assert_eq!(pf4.direction, Direction::In);
        assert_eq!(pf4.resistor, Resistor::PullUp);
        assert!(pins
            .iter()
            .all(|p| p.initial_mode == PinMode::Dio && p.direction_changeable && p.mode_changeable));
    }

    #[test]
    fn duplicates_rejected() {
        let res = PortConfig::try_new([PinConfig::new(PortId::B, 2), PinConfig::new(PortId::B, 2)]);
        assert_eq!(res, Err(Error::ParamConfig));
    }

    #[test]
    fn missing_pins_rejected() {
        assert_eq!(
            PortConfig::try_new([PinConfig::new(PortId::E, 6)]),
            Err(Error::ParamConfig)
        );
        assert_eq!(
            PortConfig::try_new([PinConfig::new(PortId::F, 5)]),
            Err(Error::ParamConfig)
        );
        assert!(PortConfig::try_new([PinConfig::new(PortId::A, 7)]).is_ok());
    }

    #[test]
    fn partial_table_is_valid_but_incomplete() {
        let cfg = PortConfig::new([PinConfig::new(PortId::A, 0), PinConfig::new(PortId::F, 4)]);
        assert!(!cfg.covers_package());
        assert!(!cfg.is_empty());
    }

    #[test]
    #[should_panic]
    fn new_panics_at_run_time_on_duplicates() {
        let pins = [PinConfig::new(PortId::C, 5), PinConfig::new(PortId::C, 5)];
        let _ = PortConfig::new(pins);
    }
}
