use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::PwmController;

/// PWM control through the sysfs interface of one PWM chip.
///
/// Layout, relative to the chip directory (`/sys/class/pwm/pwmchip0` on a Raspberry Pi):
///
/// * `export` - writing a channel number makes `pwmN/` appear.
/// * `pwmN/period`, `pwmN/duty_cycle` - both in nanoseconds.
/// * `pwmN/enable` - `1` turns the output on.
#[derive(Clone, Debug)]
pub struct SysfsPwm {
    chip: PathBuf,
}

impl SysfsPwm {
    const NANOS_PER_SECOND: u64 = 1_000_000_000;

    pub fn new<P: AsRef<Path>>(chip: P) -> Self {
        Self {
            chip: chip.as_ref().to_path_buf(),
        }
    }

    fn channel_dir(&self, channel: u32) -> PathBuf {
        self.chip.join(format!("pwm{}", channel))
    }

    fn read_attribute(&self, channel: u32, name: &str) -> io::Result<u64> {
        let raw = fs::read_to_string(self.channel_dir(channel).join(name))?;
        raw.trim()
            .parse()
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }

    fn write_attribute<V: ToString>(&self, channel: u32, name: &str, value: V) -> io::Result<()> {
        fs::write(self.channel_dir(channel).join(name), value.to_string())
    }

    /// Current attribute value, or zero when the attribute was never written.
    fn attribute_or_zero(&self, channel: u32, name: &str) -> io::Result<u64> {
        match self.read_attribute(channel, name) {
            Ok(value) => Ok(value),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(err) => Err(err),
        }
    }
}

impl PwmController for SysfsPwm {
    fn is_exported(&self, channel: u32) -> io::Result<bool> {
        match fs::metadata(self.channel_dir(channel)) {
            Ok(meta) => Ok(meta.is_dir()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn export(&self, channel: u32) -> io::Result<()> {
        fs::write(self.chip.join("export"), channel.to_string())?;
        debug!("exported pwm{} on {}", channel, self.chip.display());
        Ok(())
    }

    fn set_frequency(&self, channel: u32, hz: u32) -> io::Result<()> {
        if hz == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "PWM frequency must be positive",
            ));
        }
        let period = Self::NANOS_PER_SECOND / u64::from(hz);
        if period == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("PWM frequency {} Hz is above 1 GHz", hz),
            ));
        }

        // The kernel rejects a period shorter than the active duty cycle.
        if self.attribute_or_zero(channel, "duty_cycle")? > period {
            self.write_attribute(channel, "duty_cycle", 0)?;
        }
        self.write_attribute(channel, "period", period)
    }

    fn set_duty_cycle(&self, channel: u32, percent: f64) -> io::Result<()> {
        let period = self.read_attribute(channel, "period")?;
        let duty = (period as f64 * percent / 100.0).round() as u64;
        self.write_attribute(channel, "duty_cycle", duty.min(period))
    }

    fn enable(&self, channel: u32) -> io::Result<()> {
        self.write_attribute(channel, "enable", 1)
    }
}
