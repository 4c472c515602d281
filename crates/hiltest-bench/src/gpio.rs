//! GPIO controller over the Linux character device interface
//!
//! Uses the gpiocdev crate, the modern replacement for the deprecated sysfs
//! interface. Each stimulated pin gets its own output line request, created
//! lazily on first use and re-driven on subsequent sets; requests are
//! released when the controller drops, before the capture stage runs.

use std::collections::HashMap;
use std::path::Path;

use gpiocdev::line::{Offset, Value};
use gpiocdev::request::{Config, Request};

use hiltest_core::error::GpioError;
use hiltest_core::gpio::{GpioController, PinLevel, PinNumbering};

/// Default GPIO character device
pub const DEFAULT_GPIOCHIP: &str = "/dev/gpiochip0";

/// Physical 40-pin header position -> BCM line offset
///
/// Only the usable GPIO positions appear; power, ground and the ID EEPROM
/// pins are absent and resolve to an error.
const BOARD_TO_BCM: &[(u8, u8)] = &[
    (3, 2),
    (5, 3),
    (7, 4),
    (8, 14),
    (10, 15),
    (11, 17),
    (12, 18),
    (13, 27),
    (15, 22),
    (16, 23),
    (18, 24),
    (19, 10),
    (21, 9),
    (22, 25),
    (23, 11),
    (24, 8),
    (26, 7),
    (29, 5),
    (31, 6),
    (32, 12),
    (33, 13),
    (35, 19),
    (36, 16),
    (37, 26),
    (38, 20),
    (40, 21),
];

/// GPIO controller backed by a character device
pub struct CdevGpio {
    chip: String,
    numbering: PinNumbering,
    lines: HashMap<Offset, Request>,
}

impl CdevGpio {
    /// Open a controller on `chip` with the given numbering scheme
    ///
    /// Line requests are deferred until the first set on each pin, but a
    /// missing device is caught here so the run aborts before any stimulus
    /// is half-applied.
    pub fn open(chip: impl Into<String>, numbering: PinNumbering) -> Result<Self, GpioError> {
        let chip = chip.into();
        if !Path::new(&chip).exists() {
            return Err(GpioError::Init(format!("GPIO device '{}' not present", chip)));
        }
        log::info!("GPIO controller on {} ({:?} numbering)", chip, numbering);
        Ok(Self {
            chip,
            numbering,
            lines: HashMap::new(),
        })
    }

    fn offset_for(&self, pin: u8) -> Result<Offset, GpioError> {
        match self.numbering {
            PinNumbering::Bcm => Ok(Offset::from(pin)),
            PinNumbering::Board => BOARD_TO_BCM
                .iter()
                .find(|(board, _)| *board == pin)
                .map(|(_, bcm)| Offset::from(*bcm))
                .ok_or(GpioError::UnknownPin(pin)),
        }
    }
}

impl GpioController for CdevGpio {
    fn set_pin(&mut self, pin: u8, level: PinLevel) -> Result<(), GpioError> {
        let offset = self.offset_for(pin)?;
        let value = match level {
            PinLevel::High => Value::Active,
            PinLevel::Low => Value::Inactive,
        };

        if let Some(request) = self.lines.get(&offset) {
            request.set_value(offset, value).map_err(|e| GpioError::SetPin {
                pin,
                reason: e.to_string(),
            })?;
        } else {
            let mut config = Config::default();
            config.with_line(offset).as_output(value);
            let request = Request::from_config(config)
                .on_chip(self.chip.as_str())
                .with_consumer("hiltest")
                .request()
                .map_err(|e| GpioError::SetPin {
                    pin,
                    reason: e.to_string(),
                })?;
            self.lines.insert(offset, request);
        }

        log::debug!("pin {} (line {}) -> {:?}", pin, offset, level);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_numbering_maps_known_header_positions() {
        // Header pin 11 is BCM 17 on the 40-pin layout
        assert_eq!(
            BOARD_TO_BCM.iter().find(|(b, _)| *b == 11).map(|(_, bcm)| *bcm),
            Some(17)
        );
        // Pin 6 is ground; it must not appear in the map
        assert!(!BOARD_TO_BCM.iter().any(|(b, _)| *b == 6));
    }

    #[test]
    fn missing_device_fails_at_open() {
        let result = CdevGpio::open("/dev/hiltest-no-such-gpiochip", PinNumbering::Bcm);
        assert!(matches!(result, Err(GpioError::Init(_))));
    }
}
