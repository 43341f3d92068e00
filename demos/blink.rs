//! Blinks a LED on GPIO17 and sweeps PWM channel 0 from off to full duty cycle.
//!
//! This example assumes that GPIO17 is connected to diode's anode (+) through a resistor,
//! and that the PWM overlay is enabled (`dtoverlay=pwm-2chan` in `config.txt`).
//!
//! Run with `RUST_LOG=debug` to see what the driver does.

use rpi_cdev_hal::{Factory, LinuxResources, ParameterValue};
use std::collections::HashMap;
use std::error::Error;
use std::thread::sleep;
use std::time::Duration;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let factory = Factory::new();
    let parameters: HashMap<String, ParameterValue> = factory
        .parameters()
        .iter()
        .map(|p| (p.name.clone(), ParameterValue::from(p.default.as_str())))
        .collect();

    let failures = factory.validate_parameters(&parameters);
    if !failures.is_valid() {
        return Err(failures.to_string().into());
    }

    let driver = factory.new_driver(&parameters, &LinuxResources::default())?;
    let blink_interval = Duration::from_millis(500);

    for _ in 0..5 {
        driver.gpio_pin(17)?.write(true)?;
        sleep(blink_interval);
        driver.gpio_pin(17)?.write(false)?;
        sleep(blink_interval);
    }

    let channel = driver.pwm_channel(0)?;
    for step in 0..=10 {
        channel.set(f64::from(step) * 10.0)?;
        sleep(Duration::from_millis(200));
    }
    channel.write(false)?;

    driver.close()?;
    Ok(())
}
