use super::error::{ChannelError, PwmOperation};
use crate::backend::PwmController;
use crate::{HalError, HalResult};
use embedded_hal::digital::v2 as eh;
use log::{debug, warn};
use std::cell::Cell;
use std::fmt;
use std::io;
use std::sync::Arc;

/// One hardware PWM output, addressed by duty cycle percentage.
///
/// The channel is exported on the first `set`. Every `set` re-applies frequency, duty cycle and
/// enable, whatever the channel state was before. The PWM subsystem handle is shared with the
/// other channels of the same driver.
pub struct Channel {
    pin: u32,
    name: String,
    driver: Arc<dyn PwmController>,
    frequency: Cell<i64>,
    value: Cell<f64>,
}

impl Channel {
    /// Used when the configured frequency is not positive.
    pub const FALLBACK_FREQUENCY: u32 = 150;

    pub(crate) fn new(pin: u32, driver: Arc<dyn PwmController>, frequency: i64) -> Self {
        Self {
            pin,
            name: pin.to_string(),
            driver,
            frequency: Cell::new(frequency),
            value: Cell::new(0.0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn number(&self) -> u32 {
        self.pin
    }

    /// Frequency applied by the next `set`, in Hz.
    pub fn frequency(&self) -> i64 {
        self.frequency.get()
    }

    /// Duty cycle recorded by the last successful `set`.
    pub fn value(&self) -> f64 {
        self.value.get()
    }

    /// Drives the channel at `value` percent duty cycle, `0.0..=100.0`.
    pub fn set(&self, value: f64) -> HalResult<()> {
        if !(0.0..=100.0).contains(&value) {
            return Err(HalError::ChannelError(ChannelError::OutOfRange(value)));
        }
        let frequency = self.effective_frequency()?;

        let exported = self.step(PwmOperation::CheckExport, |d, ch| d.is_exported(ch))?;
        if !exported {
            self.step(PwmOperation::Export, |d, ch| d.export(ch))?;
            debug!("exported PWM channel {}", self.pin);
        }
        self.step(PwmOperation::Frequency, |d, ch| d.set_frequency(ch, frequency))?;
        self.step(PwmOperation::DutyCycle, |d, ch| d.set_duty_cycle(ch, value))?;
        self.step(PwmOperation::Enable, |d, ch| d.enable(ch))?;

        self.value.set(value);
        Ok(())
    }

    /// `true` is a full duty cycle, `false` turns the output off.
    pub fn write(&self, state: bool) -> HalResult<()> {
        self.set(if state { 100.0 } else { 0.0 })
    }

    /// Whether the last recorded duty cycle is exactly 100%.
    pub fn last_state(&self) -> bool {
        self.value.get() == 100.0
    }

    /// Channels do not own the PWM subsystem, so there is nothing to release.
    pub fn close(self) -> HalResult<()> {
        Ok(())
    }

    /// Positive frequency in Hz, correcting the stored one once if it was misconfigured.
    ///
    /// Frequencies too large for the PWM subsystem are an error, not clamped.
    fn effective_frequency(&self) -> HalResult<u32> {
        let frequency = self.frequency.get();
        if frequency <= 0 {
            warn!(
                "PWM channel {} frequency is {}, defaulting to {}",
                self.pin,
                frequency,
                Self::FALLBACK_FREQUENCY
            );
            self.frequency.set(i64::from(Self::FALLBACK_FREQUENCY));
            return Ok(Self::FALLBACK_FREQUENCY);
        }
        u32::try_from(frequency).map_err(|_| {
            HalError::ChannelError(ChannelError::FrequencyOutOfRange {
                channel: self.pin,
                frequency,
            })
        })
    }

    fn step<T>(
        &self,
        operation: PwmOperation,
        call: impl FnOnce(&dyn PwmController, u32) -> io::Result<T>,
    ) -> HalResult<T> {
        call(self.driver.as_ref(), self.pin)
            .map_err(|source| ChannelError::SubsystemFailed {
                channel: self.pin,
                operation,
                source,
            })
            .map_err(HalError::ChannelError)
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("pin", &self.pin)
            .field("name", &self.name)
            .field("frequency", &self.frequency.get())
            .field("value", &self.value.get())
            .finish_non_exhaustive()
    }
}

impl eh::OutputPin for Channel {
    type Error = HalError;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakePwm;
    use crate::driver::error::PwmOperation::*;
    use embedded_hal::digital::v2::OutputPin;

    fn channel(pin: u32, frequency: i64) -> (Channel, Arc<FakePwm>) {
        let pwm = Arc::new(FakePwm::default());
        (Channel::new(pin, pwm.clone(), frequency), pwm)
    }

    #[test]
    fn identity_is_the_decimal_index() {
        let (ch, _) = channel(1, 200);
        assert_eq!(ch.number(), 1);
        assert_eq!(ch.name(), "1");
        assert!(!ch.last_state());
    }

    #[test]
    fn first_set_exports_then_configures() {
        let (ch, pwm) = channel(0, 200);
        ch.set(42.5).unwrap();

        let state = pwm.state();
        assert_eq!(
            state.calls,
            vec![
                (CheckExport, 0),
                (Export, 0),
                (Frequency, 0),
                (DutyCycle, 0),
                (Enable, 0)
            ]
        );
        assert_eq!(state.frequency[&0], 200);
        assert_eq!(state.duty[&0], 42.5);
        assert!(state.enabled.contains(&0));
        assert_eq!(ch.value(), 42.5);
    }

    #[test]
    fn later_sets_skip_export_but_reapply_everything_else() {
        let (ch, pwm) = channel(1, 200);
        ch.set(10.0).unwrap();
        pwm.state().calls.clear();

        ch.set(10.0).unwrap();
        assert_eq!(
            pwm.state().calls,
            vec![(CheckExport, 1), (Frequency, 1), (DutyCycle, 1), (Enable, 1)]
        );
    }

    #[test]
    fn out_of_range_values_are_rejected_without_touching_hardware() {
        let (ch, pwm) = channel(0, 200);
        for value in [-1.0, 101.0, f64::NAN] {
            assert!(matches!(
                ch.set(value).unwrap_err(),
                HalError::ChannelError(ChannelError::OutOfRange(_))
            ));
        }
        assert!(pwm.state().calls.is_empty());
    }

    #[test]
    fn bounds_are_accepted() {
        let (ch, _) = channel(0, 200);
        ch.set(0.0).unwrap();
        assert!(!ch.last_state());
        ch.set(100.0).unwrap();
        assert!(ch.last_state());
        ch.set(99.9).unwrap();
        assert!(!ch.last_state());
    }

    #[test]
    fn write_maps_to_full_or_zero_duty() {
        let (ch, pwm) = channel(0, 200);
        ch.write(true).unwrap();
        assert_eq!(pwm.state().duty[&0], 100.0);
        assert!(ch.last_state());

        ch.write(false).unwrap();
        assert_eq!(pwm.state().duty[&0], 0.0);
        assert!(!ch.last_state());
    }

    #[test]
    fn non_positive_frequency_falls_back_and_sticks() {
        let (ch, pwm) = channel(0, 0);
        ch.set(50.0).unwrap();
        assert_eq!(pwm.state().frequency[&0], Channel::FALLBACK_FREQUENCY);
        assert_eq!(ch.frequency(), 150);

        let (ch, pwm) = channel(1, -20);
        ch.set(50.0).unwrap();
        assert_eq!(pwm.state().frequency[&1], 150);
    }

    #[test]
    fn subsystem_failure_stops_the_sequence_and_keeps_state() {
        let pwm = Arc::new(FakePwm::failing(DutyCycle));
        let ch = Channel::new(1, pwm.clone(), 200);

        match ch.set(100.0).unwrap_err() {
            HalError::ChannelError(ChannelError::SubsystemFailed {
                channel, operation, ..
            }) => {
                assert_eq!(channel, 1);
                assert_eq!(operation, DutyCycle);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!pwm.state().enabled.contains(&1));
        assert!(!ch.last_state());
        assert_eq!(ch.value(), 0.0);
    }

    #[test]
    fn export_failure_is_reported() {
        let pwm = Arc::new(FakePwm::failing(Export));
        let ch = Channel::new(0, pwm.clone(), 200);
        assert!(matches!(
            ch.set(1.0).unwrap_err(),
            HalError::ChannelError(ChannelError::SubsystemFailed {
                operation: Export,
                ..
            })
        ));
        assert_eq!(pwm.state().calls, vec![(CheckExport, 0), (Export, 0)]);
    }

    #[test]
    fn failure_at_any_step_skips_the_rest() {
        let cases = [
            (CheckExport, vec![(CheckExport, 0)]),
            (Frequency, vec![(CheckExport, 0), (Export, 0), (Frequency, 0)]),
            (
                Enable,
                vec![
                    (CheckExport, 0),
                    (Export, 0),
                    (Frequency, 0),
                    (DutyCycle, 0),
                    (Enable, 0),
                ],
            ),
        ];
        for (failing, expected_calls) in cases {
            let pwm = Arc::new(FakePwm::failing(failing));
            let ch = Channel::new(0, pwm.clone(), 200);

            match ch.set(100.0).unwrap_err() {
                HalError::ChannelError(ChannelError::SubsystemFailed { operation, .. }) => {
                    assert_eq!(operation, failing)
                }
                other => panic!("unexpected error: {:?}", other),
            }
            let state = pwm.state();
            assert_eq!(state.calls, expected_calls, "failing at {:?}", failing);
            assert!(state.enabled.is_empty());
            assert!(!ch.last_state());
        }
    }

    #[test]
    fn frequency_beyond_the_subsystem_range_is_an_error() {
        let (ch, pwm) = channel(0, 5_000_000_000);
        assert!(matches!(
            ch.set(50.0).unwrap_err(),
            HalError::ChannelError(ChannelError::FrequencyOutOfRange {
                channel: 0,
                frequency: 5_000_000_000
            })
        ));
        assert!(pwm.state().calls.is_empty());
        assert_eq!(ch.frequency(), 5_000_000_000);
        assert_eq!(ch.value(), 0.0);
    }

    #[test]
    fn output_pin_trait_toggles_full_duty() {
        let (mut ch, _) = channel(0, 200);
        ch.set_high().unwrap();
        assert!(ch.last_state());
        ch.set_low().unwrap();
        assert!(!ch.last_state());
    }

    #[test]
    fn close_is_a_no_op() {
        let (ch, pwm) = channel(0, 200);
        ch.close().unwrap();
        assert!(pwm.state().calls.is_empty());
    }
}
