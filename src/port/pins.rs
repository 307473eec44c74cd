//! # Value-level pin vocabulary
//!
//! A pin is identified by its [`PortId`] and bit number, and configured by a
//! [`PinConfig`] entry of the post-build table. [`PinMode`] is the mux
//! selection: plain digital I/O, one of the alternate peripheral functions or
//! the analog input path.

use crate::diag::Error;

//==================================================================================================
//  Ports
//==================================================================================================

/// Value-level `enum` for the GPIO ports of the package
///
/// Each variant carries the base address of its APB register block. There is
/// no other port, so an invalid port index cannot be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PortId {
    A = 0,
    B = 1,
    C = 2,
    D = 3,
    E = 4,
    F = 5,
}

impl PortId {
    pub const ALL: [PortId; 6] = [
        PortId::A,
        PortId::B,
        PortId::C,
        PortId::D,
        PortId::E,
        PortId::F,
    ];

    /// Base address of the port's APB register block
    #[inline]
    pub const fn base_address(self) -> usize {
        match self {
            PortId::A => 0x4000_4000,
            PortId::B => 0x4000_5000,
            PortId::C => 0x4000_6000,
            PortId::D => 0x4000_7000,
            PortId::E => 0x4002_4000,
            PortId::F => 0x4002_5000,
        }
    }

    /// Number of pins bonded out on the TM4C123GH6PM package
    #[inline]
    pub const fn pin_count(self) -> u8 {
        match self {
            PortId::A | PortId::B | PortId::C | PortId::D => 8,
            PortId::E => 6,
            PortId::F => 5,
        }
    }

    /// Bit of this port in the GPIO clock gating register
    #[inline]
    pub const fn clock_mask(self) -> u32 {
        1 << self as u8
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for PortId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Error> {
        match value {
            0 => Ok(PortId::A),
            1 => Ok(PortId::B),
            2 => Ok(PortId::C),
            3 => Ok(PortId::D),
            4 => Ok(PortId::E),
            5 => Ok(PortId::F),
            _ => Err(Error::ParamConfig),
        }
    }
}

//==================================================================================================
//  Electrical configuration
//==================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    In,
    Out,
}

/// Internal resistor of an input pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resistor {
    Off,
    PullUp,
    PullDown,
}

/// Initial level of an output pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

//==================================================================================================
//  Pin modes
//==================================================================================================

/// Alternate peripheral function, encoded as its port control nibble
///
/// Function 15 does not exist as a digital function: that encoding selects
/// the analog path, see [`PinMode::Analog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AltFunction {
    Af1 = 1,
    Af2 = 2,
    Af3 = 3,
    Af4 = 4,
    Af5 = 5,
    Af6 = 6,
    Af7 = 7,
    Af8 = 8,
    Af9 = 9,
    Af10 = 10,
    Af11 = 11,
    Af12 = 12,
    Af13 = 13,
    Af14 = 14,
}

/// Value-level `enum` representing pin modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    /// Plain digital input or output
    Dio,
    Alternate(AltFunction),
    /// Analog input for the ADC
    Analog,
}

impl PinMode {
    pub const ALT1: PinMode = PinMode::Alternate(AltFunction::Af1);
    pub const ALT2: PinMode = PinMode::Alternate(AltFunction::Af2);
    pub const ALT3: PinMode = PinMode::Alternate(AltFunction::Af3);
    pub const ALT4: PinMode = PinMode::Alternate(AltFunction::Af4);
    pub const ALT5: PinMode = PinMode::Alternate(AltFunction::Af5);
    pub const ALT6: PinMode = PinMode::Alternate(AltFunction::Af6);
    pub const ALT7: PinMode = PinMode::Alternate(AltFunction::Af7);
    pub const ALT8: PinMode = PinMode::Alternate(AltFunction::Af8);
    pub const ALT9: PinMode = PinMode::Alternate(AltFunction::Af9);
    pub const ALT14: PinMode = PinMode::Alternate(AltFunction::Af14);

    /// Largest raw mode value
    pub const MAX_RAW: u8 = 15;

    /// Decode a raw mode value. Values above [`PinMode::MAX_RAW`] are
    /// rejected with [`Error::ParamInvalidMode`].
    pub const fn from_raw(raw: u8) -> Result<PinMode, Error> {
        if raw > Self::MAX_RAW {
            return Err(Error::ParamInvalidMode);
        }
        Ok(Self::from_nibble(raw))
    }

    /// Decode the low four bits of `raw`, ignoring the rest
    pub const fn from_nibble(raw: u8) -> PinMode {
        use AltFunction::*;
        match raw & 0xF {
            0 => PinMode::Dio,
            1 => PinMode::Alternate(Af1),
            2 => PinMode::Alternate(Af2),
            3 => PinMode::Alternate(Af3),
            4 => PinMode::Alternate(Af4),
            5 => PinMode::Alternate(Af5),
            6 => PinMode::Alternate(Af6),
            7 => PinMode::Alternate(Af7),
            8 => PinMode::Alternate(Af8),
            9 => PinMode::Alternate(Af9),
            10 => PinMode::Alternate(Af10),
            11 => PinMode::Alternate(Af11),
            12 => PinMode::Alternate(Af12),
            13 => PinMode::Alternate(Af13),
            14 => PinMode::Alternate(Af14),
            _ => PinMode::Analog,
        }
    }

    #[inline]
    pub const fn raw(self) -> u8 {
        match self {
            PinMode::Dio => 0,
            PinMode::Alternate(func) => func as u8,
            PinMode::Analog => Self::MAX_RAW,
        }
    }
}

impl TryFrom<u8> for PinMode {
    type Error = Error;

    #[inline]
    fn try_from(raw: u8) -> Result<Self, Error> {
        PinMode::from_raw(raw)
    }
}

impl From<PinMode> for u8 {
    #[inline]
    fn from(mode: PinMode) -> u8 {
        mode.raw()
    }
}

//==================================================================================================
//  PinConfig
//==================================================================================================

/// Configuration of one physical pin, one entry of the post-build table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinConfig {
    pub port: PortId,
    /// Bit position within the port, 0..=7
    pub pin: u8,
    pub direction: Direction,
    /// Only meaningful for inputs
    pub resistor: Resistor,
    /// Only meaningful for outputs
    pub initial_level: Level,
    pub initial_mode: PinMode,
    pub direction_changeable: bool,
    pub mode_changeable: bool,
}

impl PinConfig {
    /// Digital input without pull resistor and with both changeable flags set,
    /// the state every table entry starts from
    pub const fn new(port: PortId, pin: u8) -> Self {
        PinConfig {
            port,
            pin,
            direction: Direction::In,
            resistor: Resistor::Off,
            initial_level: Level::Low,
            initial_mode: PinMode::Dio,
            direction_changeable: true,
            mode_changeable: true,
        }
    }

    pub const fn output(mut self, level: Level) -> Self {
        self.direction = Direction::Out;
        self.initial_level = level;
        self
    }

    pub const fn input(mut self, resistor: Resistor) -> Self {
        self.direction = Direction::In;
        self.resistor = resistor;
        self
    }

    pub const fn mode(mut self, mode: PinMode) -> Self {
        self.initial_mode = mode;
        self
    }

    pub const fn direction_changeable(mut self, changeable: bool) -> Self {
        self.direction_changeable = changeable;
        self
    }

    pub const fn mode_changeable(mut self, changeable: bool) -> Self {
        self.mode_changeable = changeable;
        self
    }

    #[inline]
    pub const fn mask(&self) -> u32 {
        1 << self.pin
    }

    /// PD7 (NMI) and PF0 (NMI) sit behind the lock/commit protection and must
    /// be unlocked before their mux registers accept writes
    #[inline]
    pub const fn is_protected(&self) -> bool {
        is_protected(self.port, self.pin)
    }

    /// PC0..PC3 carry the JTAG/SWD connection and are never reprogrammed
    #[inline]
    pub const fn is_debug(&self) -> bool {
        is_debug(self.port, self.pin)
    }
}

#[inline]
pub const fn is_protected(port: PortId, pin: u8) -> bool {
    matches!((port, pin), (PortId::D, 7) | (PortId::F, 0))
}

#[inline]
pub const fn is_debug(port: PortId, pin: u8) -> bool {
    matches!(port, PortId::C) && pin <= 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_modes_cover_nibble() {
        for raw in 0..=PinMode::MAX_RAW {
            let mode = PinMode::try_from(raw).unwrap();
            assert_eq!(u8::from(mode), raw);
        }
        assert_eq!(PinMode::from_raw(0), Ok(PinMode::Dio));
        assert_eq!(PinMode::from_raw(14), Ok(PinMode::ALT14));
        assert_eq!(PinMode::from_raw(15), Ok(PinMode::Analog));
    }

    #[test]
    fn raw_modes_above_nibble_rejected() {
        assert_eq!(PinMode::from_raw(16), Err(Error::ParamInvalidMode));
        assert_eq!(PinMode::try_from(0xFF), Err(Error::ParamInvalidMode));
        assert_eq!(PinMode::from_nibble(0x13), PinMode::ALT3);
    }

    #[test]
    fn port_ids() {
        let total: u32 = PortId::ALL.iter().map(|p| p.pin_count() as u32).sum();
        assert_eq!(total, 43);
        assert_eq!(PortId::F.clock_mask(), 0b10_0000);
        assert_eq!(PortId::try_from(3), Ok(PortId::D));
        assert_eq!(PortId::try_from(6), Err(Error::ParamConfig));
    }

    #[test]
    fn base_addresses_match_pac() {
        use crate::pac;
        assert_eq!(PortId::A.base_address(), pac::GPIO_PORTA::ptr() as usize);
        assert_eq!(PortId::B.base_address(), pac::GPIO_PORTB::ptr() as usize);
        assert_eq!(PortId::C.base_address(), pac::GPIO_PORTC::ptr() as usize);
        assert_eq!(PortId::D.base_address(), pac::GPIO_PORTD::ptr() as usize);
        assert_eq!(PortId::E.base_address(), pac::GPIO_PORTE::ptr() as usize);
        assert_eq!(PortId::F.base_address(), pac::GPIO_PORTF::ptr() as usize);
    }

    #[test]
    fn special_pins() {
        assert!(is_protected(PortId::D, 7));
        assert!(is_protected(PortId::F, 0));
        assert!(!is_protected(PortId::F, 1));
        assert!(!is_protected(PortId::D, 6));
        for pin in 0..4 {
            assert!(is_debug(PortId::C, pin));
        }
        assert!(!is_debug(PortId::C, 4));
        assert!(!is_debug(PortId::A, 0));
    }

    #[test]
    fn builder_sets_fields() {
        let cfg = PinConfig::new(PortId::F, 1)
            .output(Level::High)
            .mode(PinMode::ALT7)
            .direction_changeable(false);
        assert_eq!(cfg.direction, Direction::Out);
        assert_eq!(cfg.initial_level, Level::High);
        assert_eq!(cfg.initial_mode.raw(), 7);
        assert!(!cfg.direction_changeable);
        assert!(cfg.mode_changeable);
        assert_eq!(cfg.mask(), 0b10);
    }
}
