use gpiocdev::chip::Chip;
use gpiocdev::line::Value as LineValue;
use gpiocdev::Request;
use log::debug;
use std::path::{Path, PathBuf};

use super::{GpioChip, GpioLine};
use crate::driver::error::BackendError;
use crate::driver::Value;

/// GPIO chip opened through the character device.
///
/// The `Chip` handle is held for the lifetime of the driver so the device node stays open
/// while lines are requested from it.
pub struct CdevChip {
    path: PathBuf,
    chip: Chip,
}

impl CdevChip {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BackendError> {
        let path = path.as_ref().to_path_buf();
        let chip = Chip::from_path(&path)?;
        Ok(Self { path, chip })
    }
}

impl GpioChip for CdevChip {
    fn request_line(
        &mut self,
        offset: u32,
        consumer: &str,
    ) -> Result<Box<dyn GpioLine>, BackendError> {
        let request = Request::builder()
            .on_chip(self.path.clone())
            .with_consumer(consumer)
            .with_line(offset)
            .as_input()
            .request()?;
        debug!("requested line {} on {}", offset, self.path.display());

        Ok(Box::new(CdevLine { offset, request }))
    }

    fn close(self: Box<Self>) -> Result<(), BackendError> {
        let CdevChip { path, chip } = *self;
        drop(chip);
        debug!("closed {}", path.display());
        Ok(())
    }
}

/// A single line request. Dropping the request releases the line.
pub struct CdevLine {
    offset: u32,
    request: Request,
}

fn line_value(value: Value) -> LineValue {
    match value {
        Value::High => LineValue::Active,
        Value::Low => LineValue::Inactive,
    }
}

impl GpioLine for CdevLine {
    fn switch_to_input(&self) -> Result<(), BackendError> {
        let mut config = self.request.config();
        config.with_line(self.offset).as_input();
        self.request.reconfigure(&config)?;
        Ok(())
    }

    fn switch_to_output(&self, value: Value) -> Result<(), BackendError> {
        let mut config = self.request.config();
        config.with_line(self.offset).as_output(line_value(value));
        self.request.reconfigure(&config)?;
        Ok(())
    }

    fn value(&self) -> Result<Value, BackendError> {
        Ok(match self.request.value(self.offset)? {
            LineValue::Active => Value::High,
            LineValue::Inactive => Value::Low,
        })
    }

    fn set_value(&self, value: Value) -> Result<(), BackendError> {
        self.request.set_value(self.offset, line_value(value))?;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), BackendError> {
        let offset = self.offset;
        drop(self);
        debug!("released line {}", offset);
        Ok(())
    }
}
