use super::{ControlLines, HalError};
use log::info;
use rppal::gpio::{Gpio, OutputPin};

/// Control lines on Raspberry Pi GPIO. Data request is active high; the
/// output-enable pin drives a 74AHCT1G125 buffer and is active low, high puts
/// the buffer in tristate.
pub struct GpioControlLines {
    data_request: OutputPin,
    output_enable: OutputPin,
}

impl GpioControlLines {
    pub fn new(data_request_pin: u8, output_enable_pin: u8) -> Result<Self, HalError> {
        let gpio = Gpio::new()?;
        let mut data_request = gpio.get(data_request_pin)?.into_output();
        let mut output_enable = gpio.get(output_enable_pin)?.into_output();
        // idle: no request, bus released
        data_request.set_low();
        output_enable.set_high();
        info!(
            "[P1] Control lines on GPIO {} (DR) and {} (OE)",
            data_request_pin, output_enable_pin
        );
        Ok(GpioControlLines {
            data_request,
            output_enable,
        })
    }
}

impl ControlLines for GpioControlLines {
    fn set_data_request(&mut self, asserted: bool) {
        if asserted {
            self.data_request.set_high();
        } else {
            self.data_request.set_low();
        }
    }

    fn set_output_enable(&mut self, active: bool) {
        if active {
            self.output_enable.set_low();
        } else {
            self.output_enable.set_high();
        }
    }
}
