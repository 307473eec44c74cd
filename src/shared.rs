//! # Interrupt-safe global configurator
//!
//! [`SharedPort`] is a slot for a [`Port`] that can live in a
//! `static` and be used from the main loop and from interrupt handlers alike.
//! Every access takes a [`CriticalSection`] token.
//!
//! A service called before the slot was filled fails with [`Error::Uninit`].
//! No sink exists at that point, so the error is only logged and returned.
//!
//! ```ignore
//! static PORT: SharedPort<Ports> = SharedPort::new();
//!
//! interrupt::free(|cs| PORT.init(cs, ports, &mut dp.SYSCTL, &PORT_CONFIGURATION, ()));
//! // Later, in an interrupt handler
//! interrupt::free(|cs| PORT.set_pin_direction(cs, PF1, Direction::Out))?;
//! ```
use core::cell::RefCell;

use cortex_m::interrupt::{CriticalSection, Mutex};
use once_cell::unsync::OnceCell;

#[cfg(feature = "version-info-api")]
use crate::diag::VersionInfo;
use crate::diag::{DiagnosticSink, Error};
#[cfg(feature = "set-pin-direction-api")]
use crate::port::Direction;
#[cfg(any(feature = "set-pin-direction-api", feature = "set-pin-mode-api"))]
use crate::port::PinIndex;
use crate::port::{ClockGate, Port, PortConfig, PortRegisters};

pub struct SharedPort<R: PortRegisters, S: DiagnosticSink = ()> {
    slot: Mutex<OnceCell<RefCell<Port<'static, R, S>>>>,
}

impl<R: PortRegisters, S: DiagnosticSink> SharedPort<R, S> {
    pub const fn new() -> Self {
        SharedPort {
            slot: Mutex::new(OnceCell::new()),
        }
    }

    /// Configure the ports and fill the slot
    ///
    /// The first call installs a driver built from `regs` and `sink`. Later
    /// calls make `config` the active table of the installed driver and
    /// program every pin again, the same as [`Port::reconfigure`]. The
    /// backend and sink passed to such a call are not installed and are
    /// handed back.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a [`SharedPort::with`] closure on the
    /// same slot.
    pub fn init<C: ClockGate, const N: usize>(
        &self,
        cs: &CriticalSection,
        regs: R,
        clocks: &mut C,
        config: &'static PortConfig<N>,
        sink: S,
    ) -> Option<(R, S)> {
        let cell = self.slot.borrow(cs);
        if let Some(installed) = cell.get() {
            debug!("port: slot already filled, reconfiguring");
            installed.borrow_mut().reconfigure(clocks, config);
            return Some((regs, sink));
        }
        let port = Port::init(regs, clocks, config, sink);
        // The cell was checked empty inside the same critical section
        let _ = cell.set(RefCell::new(port));
        None
    }

    #[inline]
    pub fn is_initialized(&self, cs: &CriticalSection) -> bool {
        self.slot.borrow(cs).get().is_some()
    }

    /// Run `f` on the installed driver
    ///
    /// # Panics
    ///
    /// Panics if called from inside another `with` closure on the same slot.
    pub fn with<T>(
        &self,
        cs: &CriticalSection,
        f: impl FnOnce(&mut Port<'static, R, S>) -> T,
    ) -> Result<T, Error> {
        match self.slot.borrow(cs).get() {
            Some(port) => Ok(f(&mut port.borrow_mut())),
            None => {
                warn!("port: service called before init");
                Err(Error::Uninit)
            }
        }
    }

    #[cfg(feature = "set-pin-direction-api")]
    pub fn set_pin_direction(
        &self,
        cs: &CriticalSection,
        pin: PinIndex,
        direction: Direction,
    ) -> Result<(), Error> {
        self.with(cs, |port| port.set_pin_direction(pin, direction))?
    }

    pub fn refresh_port_direction(&self, cs: &CriticalSection) -> Result<(), Error> {
        self.with(cs, |port| port.refresh_port_direction())
    }

    #[cfg(feature = "set-pin-mode-api")]
    pub fn set_pin_mode(&self, cs: &CriticalSection, pin: PinIndex, mode: u8) -> Result<(), Error> {
        self.with(cs, |port| port.set_pin_mode(pin, mode))?
    }

    #[cfg(feature = "version-info-api")]
    pub fn version_info(
        &self,
        cs: &CriticalSection,
        info: Option<&mut VersionInfo>,
    ) -> Result<(), Error> {
        self.with(cs, |port| port.version_info(info))?
    }
}

impl<R: PortRegisters, S: DiagnosticSink> Default for SharedPort<R, S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(
    test,
    feature = "dev-error-detect",
    feature = "set-pin-direction-api",
    feature = "set-pin-mode-api",
    feature = "version-info-api"
))]
mod tests {
    use super::*;
    use crate::diag::tests::RecordingSink;
    use crate::diag::ServiceId;
    use crate::port::mock::{MockClocks, MockPorts};
    use crate::port::{
        Level, PinConfig, PinMode, PortId, Register, Resistor, PF1, PF2, PORT_CONFIGURATION,
    };

    fn cs() -> CriticalSection {
        // Safety: host tests run single threaded per slot and have no interrupts
        unsafe { CriticalSection::new() }
    }

    fn filled() -> SharedPort<MockPorts, RecordingSink> {
        let slot = SharedPort::new();
        let unused = slot.init(
            &cs(),
            MockPorts::new(),
            &mut MockClocks::default(),
            &PORT_CONFIGURATION,
            RecordingSink::default(),
        );
        assert!(unused.is_none());
        slot
    }

    #[test]
    fn services_before_init_are_rejected() {
        let cs = cs();
        let slot: SharedPort<MockPorts> = SharedPort::new();
        assert!(!slot.is_initialized(&cs));
        assert_eq!(
            slot.set_pin_direction(&cs, PF1, Direction::In),
            Err(Error::Uninit)
        );
        assert_eq!(slot.set_pin_mode(&cs, PF1, 0), Err(Error::Uninit));
        assert_eq!(slot.refresh_port_direction(&cs), Err(Error::Uninit));
        let mut info = VersionInfo::default();
        assert_eq!(slot.version_info(&cs, Some(&mut info)), Err(Error::Uninit));
        assert_eq!(info, VersionInfo::default());
    }

    #[test]
    fn services_after_init() {
        let cs = cs();
        let slot = filled();
        assert!(slot.is_initialized(&cs));
        slot.set_pin_direction(&cs, PF2, Direction::Out).unwrap();
        slot.set_pin_mode(&cs, PF2, PinMode::ALT7.into()).unwrap();
        slot.refresh_port_direction(&cs).unwrap();
        let mut info = VersionInfo::default();
        slot.version_info(&cs, Some(&mut info)).unwrap();
        assert_eq!(info, VersionInfo::CURRENT);
        slot.with(&cs, |port| {
            assert_eq!(port.pin_direction(PF2), Some(Direction::Out));
            assert_eq!(port.pin_mode(PF2), Some(PinMode::ALT7));
            assert!(port.registers().bit(PortId::F, Register::Afsel, 2));
        })
        .unwrap();
    }

    #[test]
    fn errors_pass_through() {
        let cs = cs();
        let slot = filled();
        assert_eq!(slot.set_pin_mode(&cs, PF2, 16), Err(Error::ParamInvalidMode));
        assert_eq!(slot.version_info(&cs, None), Err(Error::ParamPointer));
        let errors = slot.with(&cs, |port| port.sink().errors()).unwrap();
        assert_eq!(
            errors,
            vec![
                (ServiceId::SetPinMode, Error::ParamInvalidMode),
                (ServiceId::GetVersionInfo, Error::ParamPointer),
            ]
        );
    }

    #[test]
    fn second_init_same_table_is_idempotent() {
        let cs = cs();
        let slot = filled();
        let before = slot.with(&cs, |port| port.registers().snapshot()).unwrap();
        let mut clocks = MockClocks::default();
        let unused = slot.init(
            &cs,
            MockPorts::new(),
            &mut clocks,
            &PORT_CONFIGURATION,
            RecordingSink::default(),
        );
        assert!(unused.is_some());
        assert_eq!(clocks.enable_count(), 43);
        slot.with(&cs, |port| {
            assert_eq!(port.registers().snapshot(), before);
            assert!(port.sink().reports.is_empty());
        })
        .unwrap();
    }

    #[test]
    fn second_init_applies_new_table() {
        const LED_TABLE: PortConfig<2> = PortConfig::new([
            PinConfig::new(PortId::F, 1).output(Level::High),
            PinConfig::new(PortId::F, 4)
                .input(Resistor::PullDown)
                .direction_changeable(false),
        ]);
        let cs = cs();
        let slot = filled();
        let unused = slot.init(
            &cs,
            MockPorts::new(),
            &mut MockClocks::default(),
            &LED_TABLE,
            RecordingSink::default(),
        );
        assert!(unused.is_some());
        slot.with(&cs, |port| {
            assert_eq!(port.config().len(), 2);
            let regs = port.registers();
            assert!(regs.bit(PortId::F, Register::Data, 1));
            assert!(regs.bit(PortId::F, Register::Pdr, 4));
            assert!(!regs.bit(PortId::F, Register::Pur, 4));
            assert!(port.sink().reports.is_empty());
        })
        .unwrap();
        // Indices now refer to the new table
        assert_eq!(
            slot.set_pin_direction(&cs, 1, Direction::Out),
            Err(Error::DirectionUnchangeable)
        );
        assert_eq!(
            slot.set_pin_direction(&cs, PF1, Direction::Out),
            Err(Error::ParamPin)
        );
    }
}
