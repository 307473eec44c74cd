use super::pins::{Direction, Level, PinMode, PortId, Resistor};
use crate::pac::{
    self, GPIO_PORTA, GPIO_PORTB, GPIO_PORTC, GPIO_PORTD, GPIO_PORTE, GPIO_PORTF, SYSCTL,
};
use paste::paste;

/// Type definition to avoid confusion: These register blocks are identical
pub type PortRegisterBlock = pac::gpio_porta::RegisterBlock;

/// Value written to the lock register to open the commit register
pub const UNLOCK_KEY: u32 = 0x4C4F_434B;

//==================================================================================================
//  Register set
//==================================================================================================

macro_rules! registers {
    ($($Reg:ident: $doc:literal,)+) => {
        paste! {
            /// Per-port registers programmed by the configurator
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            #[cfg_attr(feature = "defmt", derive(defmt::Format))]
            pub enum Register {
                $(
                    #[doc = $doc]
                    $Reg,
                )+
            }

            impl Register {
                pub const ALL: &'static [Register] = &[$(Register::$Reg,)+];

                #[inline]
                pub const fn index(self) -> usize {
                    self as usize
                }
            }

            #[inline]
            fn read_block(block: &PortRegisterBlock, reg: Register) -> u32 {
                match reg {
                    $(Register::$Reg => block.[<$Reg:lower>].read().bits(),)+
                }
            }

            #[inline]
            #[allow(unused_unsafe)]
            fn write_block(block: &PortRegisterBlock, reg: Register, value: u32) {
                // Safety: every bit pattern is accepted by these registers
                match reg {
                    $(Register::$Reg => block.[<$Reg:lower>].write(|w| unsafe { w.bits(value) }),)+
                }
            }
        }
    };
}

registers!(
    Data: "Data register, full address mask",
    Dir: "Direction, set for output",
    Afsel: "Alternate function select",
    Pur: "Pull-up select",
    Pdr: "Pull-down select",
    Den: "Digital enable",
    Lock: "Lock for the commit register",
    Cr: "Commit, gates writes to AFSEL/PUR/PDR/DEN of protected pins",
    Amsel: "Analog mode select",
    Pctl: "Port control, one function nibble per pin",
);

//==================================================================================================
//  Mux fields
//==================================================================================================

/// Collect all enable bits needed to set a [`PinMode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MuxFields {
    pub analog: bool,
    pub alternate: bool,
    pub digital: bool,
    pub function: u8,
}

impl From<PinMode> for MuxFields {
    #[inline]
    fn from(mode: PinMode) -> Self {
        match mode {
            PinMode::Dio => MuxFields {
                analog: false,
                alternate: false,
                digital: true,
                function: 0,
            },
            PinMode::Analog => MuxFields {
                analog: true,
                alternate: true,
                digital: false,
                function: 0,
            },
            PinMode::Alternate(func) => MuxFields {
                analog: false,
                alternate: true,
                digital: true,
                function: func as u8,
            },
        }
    }
}

/// Place a function value into the port control nibble of `pin`
///
/// Returns `None` if the value does not fit into four bits.
#[inline]
pub const fn pctl_field(pin: u8, function: u8) -> Option<u32> {
    if function > 0xF || pin > 7 {
        return None;
    }
    Some((function as u32) << (pin as u32 * 4))
}

#[inline]
pub const fn pctl_mask(pin: u8) -> u32 {
    0xF << (pin as u32 * 4)
}

//==================================================================================================
//  Register Interface
//==================================================================================================

/// Provide access to the GPIO register blocks of all ports
///
/// Implementers supply the raw [`read`] and [`write`] accesses. Every access
/// must be a single volatile access performed in program order. The
/// remaining functions build the configuration sequences on top of them and
/// should not be overridden.
///
/// [`read`]: Self::read
/// [`write`]: Self::write
pub trait PortRegisters {
    fn read(&self, port: PortId, reg: Register) -> u32;

    fn write(&mut self, port: PortId, reg: Register, value: u32);

    #[inline]
    fn modify(&mut self, port: PortId, reg: Register, f: impl FnOnce(u32) -> u32) {
        let value = self.read(port, reg);
        self.write(port, reg, f(value));
    }

    #[inline]
    fn set_bits(&mut self, port: PortId, reg: Register, mask: u32) {
        self.modify(port, reg, |r| r | mask);
    }

    #[inline]
    fn clear_bits(&mut self, port: PortId, reg: Register, mask: u32) {
        self.modify(port, reg, |r| r & !mask);
    }

    #[inline]
    fn write_bit(&mut self, port: PortId, reg: Register, pin: u8, bit: bool) {
        if bit {
            self.set_bits(port, reg, 1 << pin);
        } else {
            self.clear_bits(port, reg, 1 << pin);
        }
    }

    /// Unlock the commit register and allow changes on `pin`
    #[inline]
    fn unlock_commit(&mut self, port: PortId, pin: u8) {
        self.write(port, Register::Lock, UNLOCK_KEY);
        self.set_bits(port, Register::Cr, 1 << pin);
    }

    /// Set the direction of a pin
    #[inline]
    fn set_dir(&mut self, port: PortId, pin: u8, dir: Direction) {
        self.write_bit(port, Register::Dir, pin, dir == Direction::Out);
    }

    #[inline]
    fn write_level(&mut self, port: PortId, pin: u8, level: Level) {
        self.write_bit(port, Register::Data, pin, level == Level::High);
    }

    /// Select the internal resistor. The opposite resistor is released first.
    #[inline]
    fn set_resistor(&mut self, port: PortId, pin: u8, resistor: Resistor) {
        let mask = 1 << pin;
        match resistor {
            Resistor::PullUp => {
                self.clear_bits(port, Register::Pdr, mask);
                self.set_bits(port, Register::Pur, mask);
            }
            Resistor::PullDown => {
                self.clear_bits(port, Register::Pur, mask);
                self.set_bits(port, Register::Pdr, mask);
            }
            Resistor::Off => {
                self.clear_bits(port, Register::Pur, mask);
                self.clear_bits(port, Register::Pdr, mask);
            }
        }
    }

    /// Change the pin mode
    ///
    /// The enable bit of the path being left is cleared first and the
    /// enable bit of the path being entered is set last, with the function
    /// nibble cleared before it is written.
    fn change_mode(&mut self, port: PortId, pin: u8, mode: PinMode) {
        let MuxFields {
            analog,
            alternate,
            digital,
            function,
        } = mode.into();
        let mask = 1 << pin;
        if analog {
            self.clear_bits(port, Register::Den, mask);
        } else {
            self.clear_bits(port, Register::Amsel, mask);
        }
        self.write_bit(port, Register::Afsel, pin, alternate);
        self.clear_bits(port, Register::Pctl, pctl_mask(pin));
        if let Some(field) = pctl_field(pin, function).filter(|f| *f != 0) {
            self.set_bits(port, Register::Pctl, field);
        }
        if analog {
            self.set_bits(port, Register::Amsel, mask);
        } else if digital {
            self.set_bits(port, Register::Den, mask);
        }
    }
}

impl<R: PortRegisters + ?Sized> PortRegisters for &mut R {
    #[inline]
    fn read(&self, port: PortId, reg: Register) -> u32 {
        (**self).read(port, reg)
    }

    #[inline]
    fn write(&mut self, port: PortId, reg: Register, value: u32) {
        (**self).write(port, reg, value)
    }
}

//==================================================================================================
//  Clock gating
//==================================================================================================

/// Run-mode clock gating of the GPIO ports
pub trait ClockGate {
    /// Enable the clock of `port` and return once its register block may be
    /// accessed
    fn enable_port_clock(&mut self, port: PortId);
}

impl ClockGate for SYSCTL {
    #[inline]
    fn enable_port_clock(&mut self, port: PortId) {
        // Safety: Only the bit for this port is set
        self.rcgcgpio
            .modify(|r, w| unsafe { w.bits(r.bits() | port.clock_mask()) });
        // The port needs a few clocks after gating before it responds. The
        // read back stalls until the write has reached the register.
        let _ = self.rcgcgpio.read().bits();
    }
}

//==================================================================================================
//  Ports
//==================================================================================================

/// Register backend over the six APB port blocks of the chip
///
/// The struct takes ownership of the PAC port peripherals, so exclusive
/// access to [`Ports`] guarantees exclusive access to the registers.
pub struct Ports {
    porta: GPIO_PORTA,
    portb: GPIO_PORTB,
    portc: GPIO_PORTC,
    portd: GPIO_PORTD,
    porte: GPIO_PORTE,
    portf: GPIO_PORTF,
}

impl Ports {
    pub fn new(
        porta: GPIO_PORTA,
        portb: GPIO_PORTB,
        portc: GPIO_PORTC,
        portd: GPIO_PORTD,
        porte: GPIO_PORTE,
        portf: GPIO_PORTF,
    ) -> Self {
        Ports {
            porta,
            portb,
            portc,
            portd,
            porte,
            portf,
        }
    }

    #[inline]
    fn block(&self, port: PortId) -> &PortRegisterBlock {
        // Safety: `base_address` is the address of the block this struct owns
        unsafe { &*(port.base_address() as *const PortRegisterBlock) }
    }

    /// Consumes the struct and returns the port peripherals
    #[allow(clippy::type_complexity)]
    pub fn release(
        self,
    ) -> (
        GPIO_PORTA,
        GPIO_PORTB,
        GPIO_PORTC,
        GPIO_PORTD,
        GPIO_PORTE,
        GPIO_PORTF,
    ) {
        (
            self.porta, self.portb, self.portc, self.portd, self.porte, self.portf,
        )
    }
}

impl PortRegisters for Ports {
    #[inline]
    fn read(&self, port: PortId, reg: Register) -> u32 {
        read_block(self.block(port), reg)
    }

    #[inline]
    fn write(&mut self, port: PortId, reg: Register, value: u32) {
        write_block(self.block(port), reg, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::mock::MockPorts;
    use crate::port::pins::AltFunction;

    #[test]
    fn pctl_packing() {
        assert_eq!(pctl_field(0, 1), Some(0x1));
        assert_eq!(pctl_field(7, 14), Some(0xE000_0000));
        assert_eq!(pctl_field(3, 16), None);
        assert_eq!(pctl_mask(2), 0xF00);
    }

    #[test]
    fn mux_fields_per_mode() {
        let dio = MuxFields::from(PinMode::Dio);
        assert!(!dio.analog && !dio.alternate && dio.digital && dio.function == 0);
        let adc = MuxFields::from(PinMode::Analog);
        assert!(adc.analog && adc.alternate && !adc.digital && adc.function == 0);
        let alt = MuxFields::from(PinMode::Alternate(AltFunction::Af9));
        assert!(!alt.analog && alt.alternate && alt.digital && alt.function == 9);
    }

    #[test]
    fn change_mode_replaces_stale_nibble() {
        let mut regs = MockPorts::new();
        regs.change_mode(PortId::B, 2, PinMode::ALT3);
        assert_eq!(regs.get(PortId::B, Register::Pctl), 0x300);
        regs.change_mode(PortId::B, 2, PinMode::ALT4);
        assert_eq!(regs.get(PortId::B, Register::Pctl), 0x400);
        regs.change_mode(PortId::B, 2, PinMode::Dio);
        assert_eq!(regs.get(PortId::B, Register::Pctl), 0);
        assert_eq!(regs.get(PortId::B, Register::Afsel), 0);
        assert_eq!(regs.get(PortId::B, Register::Den), 0b100);
    }

    #[test]
    fn change_mode_leaves_neighbours() {
        let mut regs = MockPorts::new();
        regs.change_mode(PortId::E, 3, PinMode::Analog);
        regs.change_mode(PortId::E, 4, PinMode::ALT8);
        assert_eq!(regs.get(PortId::E, Register::Amsel), 0b1000);
        assert_eq!(regs.get(PortId::E, Register::Den), 0b1_0000);
        assert_eq!(regs.get(PortId::E, Register::Afsel), 0b1_1000);
        assert_eq!(regs.get(PortId::E, Register::Pctl), 0x8_0000);
    }

    #[test]
    fn analog_disables_digital_before_enabling_analog() {
        let mut regs = MockPorts::new();
        regs.change_mode(PortId::D, 1, PinMode::Analog);
        let writes = regs.writes_to(PortId::D);
        assert_eq!(writes.first(), Some(&Register::Den));
        assert_eq!(writes.last(), Some(&Register::Amsel));
    }

    #[test]
    fn resistor_pairs_exclusive() {
        let mut regs = MockPorts::new();
        regs.set_resistor(PortId::A, 5, Resistor::PullUp);
        assert_eq!(regs.get(PortId::A, Register::Pur), 1 << 5);
        regs.set_resistor(PortId::A, 5, Resistor::PullDown);
        assert_eq!(regs.get(PortId::A, Register::Pur), 0);
        assert_eq!(regs.get(PortId::A, Register::Pdr), 1 << 5);
        regs.set_resistor(PortId::A, 5, Resistor::Off);
        assert_eq!(regs.get(PortId::A, Register::Pdr), 0);
    }

    #[test]
    fn register_set_is_complete() {
        assert_eq!(Register::ALL.len(), 10);
        for (i, reg) in Register::ALL.iter().enumerate() {
            assert_eq!(reg.index(), i);
        }
    }
}
