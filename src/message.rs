/// A decoded message from a kegboard device.
///
/// Only meter and temperature readings are forwarded upstream. The remaining
/// variants exist so that decoders can report everything the board says; the
/// manager drops them without complaint.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SensorMessage {
    /// Cumulative pulse count of a flow meter.
    MeterReading { meter_name: String, value: u64 },
    /// Instantaneous temperature in degrees Celsius.
    ThermoReading { sensor_name: String, value: f64 },
    /// Board greeting sent after reset.
    Hello { firmware_version: u32 },
    /// Relay/output state report.
    OutputStatus { output_name: String, enabled: bool },
}

impl SensorMessage {
    pub fn meter(meter_name: impl Into<String>, value: u64) -> Self {
        SensorMessage::MeterReading {
            meter_name: meter_name.into(),
            value,
        }
    }

    pub fn thermo(sensor_name: impl Into<String>, value: f64) -> Self {
        SensorMessage::ThermoReading {
            sensor_name: sensor_name.into(),
            value,
        }
    }
}
