use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::Direction;

/// Failure reported by a GPIO backend (chip or line).
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Enum representing possible failures when setting up or tearing down the GPIO chip.
///
/// - OpenFailed - The chip device could not be opened, usually because of permissions or a wrong
///   device name.
/// - LineRequestFailed - A line could not be requested exclusively, for example because another
///   process holds it.
/// - CloseFailed - Releasing a line or the chip handle failed during shutdown.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("failed to open GPIO chip {}", .path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
    #[error("failed to request line for pin {pin}")]
    LineRequestFailed {
        pin: u32,
        #[source]
        source: BackendError,
    },
    #[error("failed to close {component}")]
    CloseFailed {
        component: String,
        #[source]
        source: BackendError,
    },
}

/// Enum representing possible failures when using an already requested pin.
#[derive(Error, Debug)]
pub enum PinError {
    #[error("failed to switch pin {pin} to {direction:?} mode")]
    ReconfigureFailed {
        pin: u32,
        direction: Direction,
        #[source]
        source: BackendError,
    },
    #[error("failed to read pin {pin}")]
    ReadFailed {
        pin: u32,
        #[source]
        source: BackendError,
    },
    #[error("failed to write pin {pin}")]
    WriteFailed {
        pin: u32,
        #[source]
        source: BackendError,
    },
}

/// Step of a `Channel::set` call, used to tell which one failed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PwmOperation {
    CheckExport,
    Export,
    Frequency,
    DutyCycle,
    Enable,
}

impl fmt::Display for PwmOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use PwmOperation::*;
        f.write_str(match self {
            CheckExport => "check export state of",
            Export => "export",
            Frequency => "set frequency of",
            DutyCycle => "set duty cycle of",
            Enable => "enable",
        })
    }
}

/// Enum representing possible failures when driving a PWM channel.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("value must be 0-100, got {0}")]
    OutOfRange(f64),
    #[error("PWM channel {channel} cannot run at {frequency} Hz")]
    FrequencyOutOfRange { channel: u32, frequency: i64 },
    #[error("failed to {operation} PWM channel {channel}")]
    SubsystemFailed {
        channel: u32,
        operation: PwmOperation,
        #[source]
        source: io::Error,
    },
}
