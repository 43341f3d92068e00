use super::error::{BackendError, DeviceError, PinError};
use crate::backend::GpioLine;
use crate::pin_map::PinId;
use crate::{HalError, HalResult};
use derive_try_from_primitive::TryFromPrimitive;
use embedded_hal::digital::v2 as eh;
use log::debug;
use std::cell::Cell;
use std::fmt;

/// Enum representing the electrical state of a line.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
pub enum Value {
    High = 1,
    Low = 0,
}

impl From<bool> for Value {
    fn from(state: bool) -> Self {
        if state {
            Value::High
        } else {
            Value::Low
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// A bidirectional GPIO pin backed by one exclusively requested line.
///
/// The line direction is not fixed: `read` switches it to input and `write` switches it to output,
/// on every call. Both work through a shared reference, so pins handed out by
/// `Driver::pins` can be driven directly.
pub struct Pin {
    number: u32,
    name: String,
    last_state: Cell<bool>,
    line: Box<dyn GpioLine>,
}

impl Pin {
    pub(crate) fn new(id: PinId, line: Box<dyn GpioLine>) -> Self {
        Self {
            number: id.offset(),
            name: id.name(),
            last_state: Cell::new(false),
            line,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    /// Switches the line to input and samples it.
    pub fn read(&self) -> HalResult<bool> {
        self.line
            .switch_to_input()
            .map_err(|source| self.reconfigure_failed(Direction::Input, source))?;
        let value = self
            .line
            .value()
            .map_err(|source| PinError::ReadFailed {
                pin: self.number,
                source,
            })
            .map_err(HalError::PinError)?;

        Ok(value == Value::High)
    }

    /// Switches the line to output and drives it high (`true`) or low (`false`).
    ///
    /// The line is switched straight to the requested level. The state is remembered only once
    /// the line accepted it.
    pub fn write(&self, state: bool) -> HalResult<()> {
        let value = Value::from(state);
        self.line
            .switch_to_output(value)
            .map_err(|source| self.reconfigure_failed(Direction::Output, source))?;
        self.line
            .set_value(value)
            .map_err(|source| PinError::WriteFailed {
                pin: self.number,
                source,
            })
            .map_err(HalError::PinError)?;

        self.last_state.set(state);
        Ok(())
    }

    /// Value of the last successful `write`. No read-back is performed.
    pub fn last_state(&self) -> bool {
        self.last_state.get()
    }

    /// Releases the line.
    pub fn close(self) -> HalResult<()> {
        let Pin { name, line, .. } = self;
        line.close()
            .map_err(|source| DeviceError::CloseFailed {
                component: format!("pin {}", name),
                source,
            })
            .map_err(HalError::DeviceError)?;
        debug!("closed pin {}", name);
        Ok(())
    }

    fn reconfigure_failed(&self, direction: Direction, source: BackendError) -> HalError {
        HalError::PinError(PinError::ReconfigureFailed {
            pin: self.number,
            direction,
            source,
        })
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pin")
            .field("number", &self.number)
            .field("name", &self.name)
            .field("last_state", &self.last_state.get())
            .finish_non_exhaustive()
    }
}

impl eh::InputPin for Pin {
    type Error = HalError;

    fn is_high(&self) -> Result<bool, Self::Error> {
        self.read()
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        self.read().map(|v| !v)
    }
}

impl eh::OutputPin for Pin {
    type Error = HalError;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

impl eh::StatefulOutputPin for Pin {
    fn is_set_high(&self) -> Result<bool, Self::Error> {
        Ok(self.last_state())
    }

    fn is_set_low(&self) -> Result<bool, Self::Error> {
        Ok(!self.last_state())
    }
}
