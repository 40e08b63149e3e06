//! Cooling hardware as seen by the daemon.
//!
//! Real drivers speak a vendor protocol over USB; the daemon only needs the
//! capability set below. [`SimulatedDevice`] is the in-memory stand-in.

use serde::{Deserialize, Serialize};

pub mod simulated;

pub use simulated::SimulatedDevice;

/// One point of a fan curve: at `temperature` °C run the fans at `pwm` %.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub temperature: u8,
    pub pwm: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl std::fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

pub trait CoolingDevice {
    fn name(&self) -> &str;
    fn fan_count(&self) -> u32;

    fn read_pump_rpm(&mut self) -> anyhow::Result<u16>;
    /// One reading per fan.
    fn read_fans_rpm(&mut self) -> anyhow::Result<Vec<u16>>;
    /// Coolant temperature in °C.
    fn read_temperature(&mut self) -> anyhow::Result<f64>;
    fn read_firmware_version(&mut self) -> anyhow::Result<FirmwareVersion>;

    fn write_pump_mode(&mut self, mode: u8) -> anyhow::Result<()>;
    /// Applies to every fan.
    fn write_fans_pwm(&mut self, pwm: u8) -> anyhow::Result<()>;
    fn write_fans_rpm(&mut self, rpm: u16) -> anyhow::Result<()>;
    fn write_fans_curve(&mut self, curve: &[CurvePoint]) -> anyhow::Result<()>;
}
