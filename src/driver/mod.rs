use log::info;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub mod error;
mod channel;
mod pin;

use crate::backend::{GpioChip, PwmController};
use crate::{Capability, HalError, HalResult, Metadata};
use error::DeviceError;

pub use channel::Channel;
pub use pin::{Direction, Pin, Value};

/// Identity and state shared by GPIO pins and PWM channels.
pub trait HalPin {
    fn name(&self) -> &str;

    fn number(&self) -> u32;

    fn last_state(&self) -> bool;
}

impl HalPin for Pin {
    fn name(&self) -> &str {
        Pin::name(self)
    }

    fn number(&self) -> u32 {
        Pin::number(self)
    }

    fn last_state(&self) -> bool {
        Pin::last_state(self)
    }
}

impl HalPin for Channel {
    fn name(&self) -> &str {
        Channel::name(self)
    }

    fn number(&self) -> u32 {
        Channel::number(self)
    }

    fn last_state(&self) -> bool {
        Channel::last_state(self)
    }
}

/// Result of a capability query: either a GPIO pin or a PWM channel.
#[derive(Debug, Clone, Copy)]
pub enum PinRef<'a> {
    Gpio(&'a Pin),
    Pwm(&'a Channel),
}

impl<'a> PinRef<'a> {
    pub fn as_gpio(&self) -> Option<&'a Pin> {
        match *self {
            PinRef::Gpio(pin) => Some(pin),
            PinRef::Pwm(_) => None,
        }
    }

    pub fn as_pwm(&self) -> Option<&'a Channel> {
        match *self {
            PinRef::Pwm(channel) => Some(channel),
            PinRef::Gpio(_) => None,
        }
    }
}

impl HalPin for PinRef<'_> {
    fn name(&self) -> &str {
        match self {
            PinRef::Gpio(pin) => pin.name(),
            PinRef::Pwm(channel) => channel.name(),
        }
    }

    fn number(&self) -> u32 {
        match self {
            PinRef::Gpio(pin) => pin.number(),
            PinRef::Pwm(channel) => channel.number(),
        }
    }

    fn last_state(&self) -> bool {
        match self {
            PinRef::Gpio(pin) => pin.last_state(),
            PinRef::Pwm(channel) => channel.last_state(),
        }
    }
}

/// Registry of every GPIO pin and PWM channel of one board.
///
/// Built by `Factory::new_driver`. The driver exclusively owns its pins, its channels and the GPIO
/// chip handle; `close` releases all of them. Dropping the driver without calling `close` releases
/// them as well, but silently.
pub struct Driver {
    meta: Metadata,
    pins: HashMap<u32, Pin>,
    channels: HashMap<u32, Channel>,
    pwm_driver: Arc<dyn PwmController>,
    chip: Box<dyn GpioChip>,
}

impl Driver {
    pub(crate) fn new(
        meta: Metadata,
        chip: Box<dyn GpioChip>,
        pins: Vec<Pin>,
        pwm_driver: Arc<dyn PwmController>,
        channels: Vec<Channel>,
    ) -> Self {
        let driver = Self {
            meta,
            pins: pins.into_iter().map(|p| (p.number(), p)).collect(),
            channels: channels.into_iter().map(|ch| (ch.number(), ch)).collect(),
            pwm_driver,
            chip,
        };
        info!(
            "{} driver ready with {} GPIO pins and {} PWM channels",
            driver.meta.name,
            driver.pins.len(),
            driver.channels.len()
        );
        driver
    }

    pub fn metadata(&self) -> &Metadata {
        &self.meta
    }

    /// PWM subsystem handle shared by every channel.
    pub fn pwm_driver(&self) -> &Arc<dyn PwmController> {
        &self.pwm_driver
    }

    /// Closes every pin, then the chip handle.
    ///
    /// Stops at the first failure; resources not closed yet are still released when they are
    /// dropped, but their errors are not reported.
    pub fn close(self) -> HalResult<()> {
        let Driver { pins, chip, .. } = self;

        let mut pins: Vec<Pin> = pins.into_values().collect();
        pins.sort_by_key(|p| p.number());
        for pin in pins {
            pin.close()?;
        }

        chip.close()
            .map_err(|source| DeviceError::CloseFailed {
                component: "chip".to_string(),
                source,
            })
            .map_err(HalError::DeviceError)?;
        info!("driver closed");
        Ok(())
    }

    /// Pins serving `capability`, sorted by name.
    pub fn pins(&self, capability: Capability) -> HalResult<Vec<PinRef<'_>>> {
        use Capability::*;
        match capability {
            DigitalInput | DigitalOutput => {
                Ok(self.gpio_pins().into_iter().map(PinRef::Gpio).collect())
            }
            PWM => Ok(self.pwm_channels().into_iter().map(PinRef::Pwm).collect()),
            other => Err(HalError::UnsupportedCapability(other)),
        }
    }

    /// All GPIO pins, sorted by name (`GP10` sorts before `GP2`).
    pub fn gpio_pins(&self) -> Vec<&Pin> {
        let mut pins: Vec<&Pin> = self.pins.values().collect();
        pins.sort_by(|a, b| a.name().cmp(b.name()));
        pins
    }

    pub fn gpio_pin(&self, number: u32) -> HalResult<&Pin> {
        self.pins.get(&number).ok_or(HalError::NotFound {
            kind: "pin",
            number,
        })
    }

    pub fn digital_input_pins(&self) -> Vec<&Pin> {
        self.gpio_pins()
    }

    pub fn digital_input_pin(&self, number: u32) -> HalResult<&Pin> {
        self.gpio_pin(number)
    }

    pub fn digital_output_pins(&self) -> Vec<&Pin> {
        self.gpio_pins()
    }

    pub fn digital_output_pin(&self, number: u32) -> HalResult<&Pin> {
        self.gpio_pin(number)
    }

    /// All PWM channels, sorted by name.
    pub fn pwm_channels(&self) -> Vec<&Channel> {
        let mut channels: Vec<&Channel> = self.channels.values().collect();
        channels.sort_by(|a, b| a.name().cmp(b.name()));
        channels
    }

    pub fn pwm_channel(&self, number: u32) -> HalResult<&Channel> {
        self.channels.get(&number).ok_or(HalError::NotFound {
            kind: "pwm channel",
            number,
        })
    }
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("meta", &self.meta)
            .field("pins", &self.gpio_pins())
            .field("channels", &self.pwm_channels())
            .finish_non_exhaustive()
    }
}
