use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::backend::HardwareResources;
use crate::driver::error::DeviceError;
use crate::driver::{Channel, Driver, Pin};
use crate::pin_map::{PinId, PWM_CHANNELS};
use crate::{Capability, HalError, HalResult, Metadata};

/// Name of the PWM frequency parameter, in Hz.
pub const FREQUENCY: &str = "Frequency";
/// Name of the GPIO chip parameter, a device node name such as `gpiochip0`.
pub const GPIO_DEVICE: &str = "GPIO Device";

const CONSUMER: &str = "rpi-cdev-hal";

/// Type of a configuration parameter as advertised to the host.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParameterType {
    Integer,
    String,
}

/// One entry of the factory parameter schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigParameter {
    pub name: String,
    pub kind: ParameterType,
    pub order: usize,
    pub default: String,
}

/// A configuration value as handed over by the host.
#[derive(Clone, Debug, PartialEq)]
pub enum ParameterValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl ParameterValue {
    /// Integer view of the value: integers, integral floats and decimal strings convert.
    pub fn as_integer(&self) -> Option<i64> {
        use ParameterValue::*;
        match self {
            Integer(v) => Some(*v),
            Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
                Some(*v as i64)
            }
            Float(_) => None,
            Text(v) => v.trim().parse().ok(),
            Bool(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParameterValue::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ParameterValue::*;
        match self {
            Integer(v) => write!(f, "{}", v),
            Float(v) => write!(f, "{}", v),
            Text(v) => f.write_str(v),
            Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Integer(v)
    }
}

impl From<i32> for ParameterValue {
    fn from(v: i32) -> Self {
        ParameterValue::Integer(i64::from(v))
    }
}

impl From<u32> for ParameterValue {
    fn from(v: u32) -> Self {
        ParameterValue::Integer(i64::from(v))
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Float(v)
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        ParameterValue::Bool(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::Text(v.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        ParameterValue::Text(v)
    }
}

/// Validation messages keyed by parameter name. Empty means the parameters are valid.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationFailures(BTreeMap<String, Vec<String>>);

impl ValidationFailures {
    pub fn is_valid(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for `parameter`, if any.
    pub fn get(&self, parameter: &str) -> Option<&[String]> {
        self.0.get(parameter).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }

    fn add(&mut self, parameter: &str, message: String) {
        self.0.entry(parameter.to_string()).or_default().push(message);
    }
}

impl fmt::Display for ValidationFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (parameter, messages)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", parameter, messages.join(" "))?;
        }
        Ok(())
    }
}

/// Validated parameters, ready for driver construction.
struct Settings {
    frequency: i64,
    device: PathBuf,
}

/// Construction point for `Driver`s.
///
/// A factory only carries immutable metadata and the parameter schema, so it can be created
/// wherever it is needed; every instance describes the same driver. The device directory defaults
/// to `/dev`.
#[derive(Clone, Debug)]
pub struct Factory {
    meta: Metadata,
    parameters: Vec<ConfigParameter>,
    device_dir: PathBuf,
}

impl Factory {
    const DEFAULT_DEVICE_DIR: &'static str = "/dev";

    pub fn new() -> Self {
        Self::with_device_dir(Self::DEFAULT_DEVICE_DIR)
    }

    /// Looks GPIO devices up in `device_dir` instead of `/dev`.
    pub fn with_device_dir<P: Into<PathBuf>>(device_dir: P) -> Self {
        Self {
            meta: Metadata {
                name: "rpi".to_string(),
                description:
                    "hardware peripherals and GPIO channels on the base raspberry pi hardware"
                        .to_string(),
                capabilities: vec![
                    Capability::DigitalInput,
                    Capability::DigitalOutput,
                    Capability::PWM,
                ],
            },
            parameters: vec![
                ConfigParameter {
                    name: FREQUENCY.to_string(),
                    kind: ParameterType::Integer,
                    order: 0,
                    default: "200".to_string(),
                },
                ConfigParameter {
                    name: GPIO_DEVICE.to_string(),
                    kind: ParameterType::String,
                    order: 1,
                    default: "gpiochip0".to_string(),
                },
            ],
            device_dir: device_dir.into(),
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.meta
    }

    pub fn parameters(&self) -> &[ConfigParameter] {
        &self.parameters
    }

    pub fn device_dir(&self) -> &Path {
        &self.device_dir
    }

    /// Checks every parameter and collects all problems found, not just the first one.
    ///
    /// Parameters not part of the schema are ignored.
    pub fn validate_parameters(
        &self,
        parameters: &HashMap<String, ParameterValue>,
    ) -> ValidationFailures {
        self.settings(parameters).err().unwrap_or_default()
    }

    /// Builds a driver owning every supported GPIO line of the configured chip and both PWM
    /// channels.
    ///
    /// Construction is all-or-nothing: when a line cannot be requested, the lines acquired so far
    /// and the chip are released before the error is returned.
    pub fn new_driver(
        &self,
        parameters: &HashMap<String, ParameterValue>,
        resources: &dyn HardwareResources,
    ) -> HalResult<Driver> {
        let Settings { frequency, device } = self
            .settings(parameters)
            .map_err(HalError::ValidationError)?;

        let mut chip = resources
            .open_chip(&device)
            .map_err(|source| DeviceError::OpenFailed {
                path: device.clone(),
                source,
            })
            .map_err(HalError::DeviceError)?;

        let mut pins = Vec::with_capacity(PinId::ALL.len());
        for id in PinId::ALL.iter().copied() {
            match chip.request_line(id.offset(), CONSUMER) {
                Ok(line) => pins.push(Pin::new(id, line)),
                Err(source) => {
                    for pin in pins {
                        if let Err(err) = pin.close() {
                            warn!("failed to release pin during rollback: {:?}", err);
                        }
                    }
                    if let Err(err) = chip.close() {
                        warn!("failed to close {} during rollback: {}", device.display(), err);
                    }
                    return Err(HalError::DeviceError(DeviceError::LineRequestFailed {
                        pin: id.offset(),
                        source,
                    }));
                }
            }
        }
        debug!("requested {} lines on {}", pins.len(), device.display());

        let pwm_driver = resources.pwm_controller();
        let channels = PWM_CHANNELS
            .iter()
            .map(|&n| Channel::new(n, pwm_driver.clone(), frequency))
            .collect();

        Ok(Driver::new(self.meta.clone(), chip, pins, pwm_driver, channels))
    }

    fn settings(
        &self,
        parameters: &HashMap<String, ParameterValue>,
    ) -> Result<Settings, ValidationFailures> {
        let mut failures = ValidationFailures::default();

        let frequency = match parameters.get(FREQUENCY) {
            Some(v) => {
                let frequency = v.as_integer();
                if frequency.is_none() {
                    failures.add(
                        FREQUENCY,
                        format!("Frequency is not a number. {} was received.", v),
                    );
                }
                frequency
            }
            None => {
                failures.add(
                    FREQUENCY,
                    "Frequency is required parameter, but was not received.".to_string(),
                );
                None
            }
        };

        let device = match parameters.get(GPIO_DEVICE) {
            Some(ParameterValue::Text(name)) => self.check_device(name, &mut failures),
            Some(v) => {
                failures.add(
                    GPIO_DEVICE,
                    format!("GPIO Device is not a string. {} was received.", v),
                );
                None
            }
            None => {
                failures.add(
                    GPIO_DEVICE,
                    "GPIO Device is a required parameter, but was not received.".to_string(),
                );
                None
            }
        };

        match (frequency, device) {
            (Some(frequency), Some(device)) if failures.is_valid() => {
                Ok(Settings { frequency, device })
            }
            _ => Err(failures),
        }
    }

    fn check_device(&self, name: &str, failures: &mut ValidationFailures) -> Option<PathBuf> {
        if name.is_empty() || name.contains('/') || name == ".." || name == "." {
            failures.add(
                GPIO_DEVICE,
                format!("Invalid GPIO Device {}. Expected a device name.", name),
            );
            return None;
        }

        let path = self.device_dir.join(name);
        match nix::sys::stat::stat(path.as_path()) {
            Ok(_) => Some(path),
            Err(err) => {
                failures.add(
                    GPIO_DEVICE,
                    format!("Invalid GPIO Device {}. {}", path.display(), err),
                );
                None
            }
        }
    }
}

impl Default for Factory {
    fn default() -> Self {
        Self::new()
    }
}
