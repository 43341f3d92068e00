//! In-memory stand-ins for the GPIO chip and the PWM subsystem, recording what the driver asks for.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{GpioChip, GpioLine, HardwareResources, PwmController};
use crate::driver::error::{BackendError, PwmOperation};
use crate::driver::{Direction, Value};

#[derive(Clone, Debug, Default)]
pub(crate) struct LineState {
    pub direction: Option<Direction>,
    pub level: u8,
    /// Every level put on the line while it was an output, in order.
    pub driven: Vec<u8>,
    pub reconfigures: usize,
    pub fail_reconfigure: bool,
    pub fail_io: bool,
}

#[derive(Debug, Default)]
pub(crate) struct ChipState {
    pub lines: BTreeMap<u32, LineState>,
    pub requested: Vec<u32>,
    pub released: Vec<u32>,
    pub closed: bool,
    pub fail_request: Option<u32>,
    pub fail_close_line: Option<u32>,
    pub fail_close: bool,
}

pub(crate) type SharedChip = Arc<Mutex<ChipState>>;

pub(crate) fn shared_chip() -> SharedChip {
    Arc::new(Mutex::new(ChipState::default()))
}

/// A line already requested from a fresh fake chip.
pub(crate) fn line(offset: u32) -> (Box<dyn GpioLine>, SharedChip) {
    let state = shared_chip();
    let mut chip = FakeChip {
        state: state.clone(),
    };
    let line = chip.request_line(offset, "test").unwrap();
    (line, state)
}

pub(crate) struct FakeChip {
    state: SharedChip,
}

impl GpioChip for FakeChip {
    fn request_line(
        &mut self,
        offset: u32,
        _consumer: &str,
    ) -> Result<Box<dyn GpioLine>, BackendError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_request == Some(offset) {
            return Err(format!("line {} busy", offset).into());
        }
        state.requested.push(offset);
        state.lines.insert(offset, LineState::default());
        Ok(Box::new(FakeLine {
            offset,
            state: self.state.clone(),
        }))
    }

    fn close(self: Box<Self>) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_close {
            return Err("chip close refused".into());
        }
        state.closed = true;
        Ok(())
    }
}

pub(crate) struct FakeLine {
    offset: u32,
    state: SharedChip,
}

impl FakeLine {
    fn with_line<T>(
        &self,
        f: impl FnOnce(&mut LineState) -> Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        let mut state = self.state.lock().unwrap();
        let line = state
            .lines
            .get_mut(&self.offset)
            .ok_or_else(|| BackendError::from(format!("line {} released", self.offset)))?;
        f(line)
    }

    fn switch(&self, direction: Direction, value: Option<Value>) -> Result<(), BackendError> {
        self.with_line(|line| {
            if line.fail_reconfigure {
                return Err("reconfigure refused".into());
            }
            line.direction = Some(direction);
            line.reconfigures += 1;
            if let Some(value) = value {
                line.level = value as u8;
                line.driven.push(line.level);
            }
            Ok(())
        })
    }
}

impl GpioLine for FakeLine {
    fn switch_to_input(&self) -> Result<(), BackendError> {
        self.switch(Direction::Input, None)
    }

    fn switch_to_output(&self, value: Value) -> Result<(), BackendError> {
        self.switch(Direction::Output, Some(value))
    }

    fn value(&self) -> Result<Value, BackendError> {
        self.with_line(|line| {
            if line.fail_io {
                return Err("read refused".into());
            }
            Value::try_from(line.level).map_err(|raw| format!("bad level {:?}", raw).into())
        })
    }

    fn set_value(&self, value: Value) -> Result<(), BackendError> {
        self.with_line(|line| {
            if line.fail_io {
                return Err("write refused".into());
            }
            if line.direction != Some(Direction::Output) {
                return Err("line is not an output".into());
            }
            line.level = value as u8;
            line.driven.push(line.level);
            Ok(())
        })
    }

    fn close(self: Box<Self>) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_close_line == Some(self.offset) {
            return Err(format!("line {} close refused", self.offset).into());
        }
        state.lines.remove(&self.offset);
        state.released.push(self.offset);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct PwmState {
    pub exported: BTreeSet<u32>,
    pub frequency: BTreeMap<u32, u32>,
    pub duty: BTreeMap<u32, f64>,
    pub enabled: BTreeSet<u32>,
    pub calls: Vec<(PwmOperation, u32)>,
    pub fail: Option<PwmOperation>,
}

#[derive(Debug, Default)]
pub(crate) struct FakePwm {
    state: Mutex<PwmState>,
}

impl FakePwm {
    pub fn failing(operation: PwmOperation) -> Self {
        let pwm = Self::default();
        pwm.state().fail = Some(operation);
        pwm
    }

    pub fn state(&self) -> MutexGuard<'_, PwmState> {
        self.state.lock().unwrap()
    }

    fn record(
        &self,
        operation: PwmOperation,
        channel: u32,
    ) -> io::Result<MutexGuard<'_, PwmState>> {
        let mut state = self.state();
        state.calls.push((operation, channel));
        if state.fail == Some(operation) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, operation.to_string()));
        }
        Ok(state)
    }
}

impl PwmController for FakePwm {
    fn is_exported(&self, channel: u32) -> io::Result<bool> {
        let state = self.record(PwmOperation::CheckExport, channel)?;
        Ok(state.exported.contains(&channel))
    }

    fn export(&self, channel: u32) -> io::Result<()> {
        self.record(PwmOperation::Export, channel)?.exported.insert(channel);
        Ok(())
    }

    fn set_frequency(&self, channel: u32, hz: u32) -> io::Result<()> {
        self.record(PwmOperation::Frequency, channel)?.frequency.insert(channel, hz);
        Ok(())
    }

    fn set_duty_cycle(&self, channel: u32, percent: f64) -> io::Result<()> {
        self.record(PwmOperation::DutyCycle, channel)?.duty.insert(channel, percent);
        Ok(())
    }

    fn enable(&self, channel: u32) -> io::Result<()> {
        self.record(PwmOperation::Enable, channel)?.enabled.insert(channel);
        Ok(())
    }
}

pub(crate) struct FakeResources {
    pub chip: SharedChip,
    pub pwm: Arc<FakePwm>,
    pub refuse_open: bool,
    pub opened: Mutex<Vec<PathBuf>>,
}

impl FakeResources {
    pub fn new() -> Self {
        Self {
            chip: shared_chip(),
            pwm: Arc::new(FakePwm::default()),
            refuse_open: false,
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn chip(&self) -> MutexGuard<'_, ChipState> {
        self.chip.lock().unwrap()
    }
}

impl HardwareResources for FakeResources {
    fn open_chip(&self, path: &Path) -> Result<Box<dyn GpioChip>, BackendError> {
        if self.refuse_open {
            return Err(format!("{} is not a GPIO chip", path.display()).into());
        }
        self.opened.lock().unwrap().push(path.to_path_buf());
        Ok(Box::new(FakeChip {
            state: self.chip.clone(),
        }))
    }

    fn pwm_controller(&self) -> Arc<dyn PwmController> {
        self.pwm.clone()
    }
}
