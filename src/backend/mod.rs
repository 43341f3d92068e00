//! Seams between the driver registry and the kernel interfaces it delegates to.
//!
//! `cdev` implements the GPIO traits on top of the GPIO character device and `sysfs` implements
//! `PwmController` on top of `/sys/class/pwm`. `LinuxResources` bundles both and is what
//! `Factory::new_driver` uses on a real board.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::driver::error::BackendError;
use crate::driver::Value;

mod cdev;
#[cfg(test)]
pub(crate) mod fake;
mod sysfs;

pub use cdev::{CdevChip, CdevLine};
pub use sysfs::SysfsPwm;

/// An opened GPIO chip device that hands out exclusive line requests.
pub trait GpioChip: Send {
    /// Requests exclusive access to a single line, initially configured as input.
    fn request_line(
        &mut self,
        offset: u32,
        consumer: &str,
    ) -> Result<Box<dyn GpioLine>, BackendError>;

    /// Releases the chip handle.
    fn close(self: Box<Self>) -> Result<(), BackendError>;
}

/// One exclusively requested GPIO line.
pub trait GpioLine: Send {
    fn switch_to_input(&self) -> Result<(), BackendError>;

    /// Switches the line to output, driving `value` from the moment it becomes one.
    fn switch_to_output(&self, value: Value) -> Result<(), BackendError>;

    fn value(&self) -> Result<Value, BackendError>;

    fn set_value(&self, value: Value) -> Result<(), BackendError>;

    /// Releases the line back to the kernel.
    fn close(self: Box<Self>) -> Result<(), BackendError>;
}

/// Control surface of the PWM subsystem, shared by every `Channel` of a driver.
///
/// Duty cycle is given as a percentage of the period, frequency in Hz.
pub trait PwmController: Send + Sync {
    fn is_exported(&self, channel: u32) -> io::Result<bool>;

    fn export(&self, channel: u32) -> io::Result<()>;

    fn set_frequency(&self, channel: u32, hz: u32) -> io::Result<()>;

    fn set_duty_cycle(&self, channel: u32, percent: f64) -> io::Result<()>;

    fn enable(&self, channel: u32) -> io::Result<()>;
}

/// Hardware handed to `Factory::new_driver`: a way to open GPIO chips and a fresh PWM
/// subsystem handle.
pub trait HardwareResources {
    fn open_chip(&self, path: &Path) -> Result<Box<dyn GpioChip>, BackendError>;

    fn pwm_controller(&self) -> Arc<dyn PwmController>;
}

/// Real hardware: `gpiocdev` for GPIO chips and sysfs for PWM.
#[derive(Clone, Debug)]
pub struct LinuxResources {
    pwm_chip: PathBuf,
}

impl LinuxResources {
    const DEFAULT_PWM_CHIP: &'static str = "/sys/class/pwm/pwmchip0";

    /// Uses a PWM chip directory other than `/sys/class/pwm/pwmchip0`.
    pub fn with_pwm_chip<P: Into<PathBuf>>(pwm_chip: P) -> Self {
        Self {
            pwm_chip: pwm_chip.into(),
        }
    }

    pub fn pwm_chip(&self) -> &Path {
        &self.pwm_chip
    }
}

impl Default for LinuxResources {
    fn default() -> Self {
        Self::with_pwm_chip(Self::DEFAULT_PWM_CHIP)
    }
}

impl HardwareResources for LinuxResources {
    fn open_chip(&self, path: &Path) -> Result<Box<dyn GpioChip>, BackendError> {
        Ok(Box::new(CdevChip::open(path)?))
    }

    fn pwm_controller(&self) -> Arc<dyn PwmController> {
        Arc::new(SysfsPwm::new(&self.pwm_chip))
    }
}
