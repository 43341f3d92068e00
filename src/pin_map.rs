use derive_try_from_primitive::TryFromPrimitive;

/// BCM GPIO numbers exposed on the Raspberry Pi header that this driver manages.
///
/// GPIO4 is left out on purpose, it is commonly claimed by the 1-wire overlay.
/// The discriminant is the line offset on the SoC GPIO chip.
#[repr(u8)]
#[derive(TryFromPrimitive, Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum PinId {
    Gpio2 = 2,
    Gpio3 = 3,
    Gpio5 = 5,
    Gpio6 = 6,
    Gpio7 = 7,
    Gpio8 = 8,
    Gpio9 = 9,
    Gpio10 = 10,
    Gpio11 = 11,
    Gpio12 = 12,
    Gpio13 = 13,
    Gpio14 = 14,
    Gpio15 = 15,
    Gpio16 = 16,
    Gpio17 = 17,
    Gpio18 = 18,
    Gpio19 = 19,
    Gpio20 = 20,
    Gpio21 = 21,
    Gpio22 = 22,
    Gpio23 = 23,
    Gpio24 = 24,
    Gpio25 = 25,
    Gpio26 = 26,
    Gpio27 = 27,
}

impl PinId {
    /// Every supported pin, in ascending GPIO order.
    pub const ALL: [PinId; 25] = [
        PinId::Gpio2,
        PinId::Gpio3,
        PinId::Gpio5,
        PinId::Gpio6,
        PinId::Gpio7,
        PinId::Gpio8,
        PinId::Gpio9,
        PinId::Gpio10,
        PinId::Gpio11,
        PinId::Gpio12,
        PinId::Gpio13,
        PinId::Gpio14,
        PinId::Gpio15,
        PinId::Gpio16,
        PinId::Gpio17,
        PinId::Gpio18,
        PinId::Gpio19,
        PinId::Gpio20,
        PinId::Gpio21,
        PinId::Gpio22,
        PinId::Gpio23,
        PinId::Gpio24,
        PinId::Gpio25,
        PinId::Gpio26,
        PinId::Gpio27,
    ];

    pub fn offset(self) -> u32 {
        self as u32
    }

    /// Display name used by the driver registry, e.g. `GP17`.
    pub fn name(self) -> String {
        format!("GP{}", self.offset())
    }

    /// Looks up a supported pin by its GPIO number.
    pub fn from_number(number: u32) -> Option<Self> {
        u8::try_from(number).ok().and_then(|n| PinId::try_from(n).ok())
    }
}

/// Hardware PWM outputs of the SoC (PWM0 and PWM1).
pub const PWM_CHANNELS: [u32; 2] = [0, 1];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_lists_every_variant_in_order() {
        let offsets: Vec<u32> = PinId::ALL.iter().map(|p| p.offset()).collect();
        let mut expected = vec![2, 3];
        expected.extend(5..=27);
        assert_eq!(offsets, expected);
    }

    #[test]
    fn from_number_rejects_unsupported_gpio() {
        assert_eq!(PinId::from_number(17), Some(PinId::Gpio17));
        assert_eq!(PinId::from_number(4), None);
        assert_eq!(PinId::from_number(28), None);
        assert_eq!(PinId::from_number(258), None);
    }

    #[test]
    fn name_prefixes_gp() {
        assert_eq!(PinId::Gpio5.name(), "GP5");
    }
}
