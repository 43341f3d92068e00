//! This crate exposes digital GPIO pins and the two hardware PWM channels of a Raspberry Pi
//! to orchestration code that only knows about a small set of capabilities.
//!
//! GPIO lines are driven through the Linux
//! [GPIO character device](https://www.kernel.org/doc/Documentation/ABI/testing/gpio-cdev)
//! (via the [`gpiocdev`](https://crates.io/crates/gpiocdev) crate) and PWM channels through the
//! sysfs PWM interface (`/sys/class/pwm/pwmchipN`).
//!
//! The entry point is `Factory`: it describes the parameters a driver needs, validates them and
//! builds a `Driver`. The driver owns one `Pin` per supported GPIO number and one `Channel` per
//! PWM output, and hands them out by number or by `Capability`.
//!
//! ```no_run
//! use rpi_cdev_hal::{Factory, LinuxResources, ParameterValue};
//! use std::collections::HashMap;
//!
//! let factory = Factory::new();
//! let mut parameters = HashMap::new();
//! parameters.insert("Frequency".to_string(), ParameterValue::from(200));
//! parameters.insert("GPIO Device".to_string(), ParameterValue::from("gpiochip0"));
//!
//! let driver = factory.new_driver(&parameters, &LinuxResources::default())?;
//! driver.gpio_pin(17)?.write(true)?;
//! driver.pwm_channel(0)?.set(42.5)?;
//! driver.close()?;
//! # Ok::<(), rpi_cdev_hal::HalError>(())
//! ```
//!
//! Pin `read`/`write` calls switch the line direction on every call. Pins and channels are driven
//! through shared references, including the ones returned by capability queries. They are not
//! `Sync`: a driver can move to another thread, but its pins cannot be shared between threads.

use std::fmt;
use thiserror::Error;

pub mod backend;
mod driver;
mod factory;
mod pin_map;

pub use backend::{GpioChip, GpioLine, HardwareResources, LinuxResources, PwmController};
pub use driver::error::{BackendError, ChannelError, DeviceError, PinError, PwmOperation};
pub use driver::{Channel, Direction, Driver, HalPin, Pin, PinRef, Value};
pub use factory::{
    ConfigParameter, Factory, ParameterType, ParameterValue, ValidationFailures, FREQUENCY,
    GPIO_DEVICE,
};
pub use pin_map::{PinId, PWM_CHANNELS};

/// Main error type for this crate.
///
/// For more details, see `DeviceError`, `PinError` and `ChannelError` enums documentation.
#[derive(Error, Debug)]
pub enum HalError {
    #[error("invalid driver parameters: {0}")]
    ValidationError(ValidationFailures),
    #[error("error while operating on the GPIO chip")]
    DeviceError(#[source] DeviceError),
    #[error("error while operating on a pin")]
    PinError(#[source] PinError),
    #[error("error while operating on a PWM channel")]
    ChannelError(#[source] ChannelError),
    #[error("unsupported capability: {0}")]
    UnsupportedCapability(Capability),
    #[error("{kind} {number} unknown")]
    NotFound { kind: &'static str, number: u32 },
}

pub type HalResult<T> = Result<T, HalError>;

/// Category of hardware function used to classify and query pins.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    DigitalInput,
    DigitalOutput,
    PWM,
    AnalogInput,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Capability::*;
        f.write_str(match self {
            DigitalInput => "digital-input",
            DigitalOutput => "digital-output",
            PWM => "pwm",
            AnalogInput => "analog-input",
        })
    }
}

/// Static description of a driver: what it is called and which capabilities it serves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Metadata {
    pub name: String,
    pub description: String,
    pub capabilities: Vec<Capability>,
}

impl Metadata {
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}
