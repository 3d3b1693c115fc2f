use std::time::Duration;

use log::{info, warn};
use serialport::{DataBits, Parity, SerialPort, StopBits};

use crate::config::SerialSettings;
use crate::error::DeviceError;

pub fn open_serial_port(settings: &SerialSettings) -> Result<Box<dyn SerialPort>, DeviceError> {
    let data_bits = parse_data_bits(&settings.data_bits);
    let parity = parse_parity(&settings.parity);
    let stop_bits = parse_stop_bits(&settings.stop_bits);

    let builder = serialport::new(&settings.path, settings.baud_rate)
        .data_bits(data_bits)
        .parity(parity)
        .stop_bits(stop_bits)
        .timeout(Duration::from_millis(settings.read_timeout_ms));

    match builder.open() {
        Ok(port) => {
            info!(
                "Serial port {} configured: {} baud, {:?}, {:?}, {:?}",
                settings.path, settings.baud_rate, data_bits, parity, stop_bits
            );
            Ok(port)
        }
        Err(source) => Err(DeviceError::Open {
            path: settings.path.clone(),
            source,
        }),
    }
}

pub fn parse_data_bits(bits: &str) -> DataBits {
    match bits.trim() {
        "5" => DataBits::Five,
        "6" => DataBits::Six,
        "7" => DataBits::Seven,
        "8" => DataBits::Eight,
        other => {
            warn!("Unknown data bits {:?}, using 8", other);
            DataBits::Eight
        }
    }
}

pub fn parse_parity(parity: &str) -> Parity {
    match parity.trim().to_lowercase().as_str() {
        "odd" => Parity::Odd,
        "even" => Parity::Even,
        "none" => Parity::None,
        other => {
            warn!("Unknown parity {:?}, using none", other);
            Parity::None
        }
    }
}

pub fn parse_stop_bits(bits: &str) -> StopBits {
    match bits.trim() {
        "1" => StopBits::One,
        "2" => StopBits::Two,
        other => {
            warn!("Unknown stop bits {:?}, using 1", other);
            StopBits::One
        }
    }
}
