use anyhow::bail;
use tracing::debug;

use super::{CoolingDevice, CurvePoint, FirmwareVersion};

const MAX_PWM: u8 = 100;
/// Fan speed at 100 % duty cycle.
const MAX_FAN_RPM: u16 = 2000;
const DEFAULT_TEMPERATURE: f64 = 30.0;

/// How the fans are currently driven.
#[derive(Debug, Clone, PartialEq)]
pub enum FanControl {
    Pwm(u8),
    Rpm(u16),
    Curve(Vec<CurvePoint>),
}

/// In-memory cooler. Readings follow whatever was last written.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    name: String,
    fan_count: u32,
    firmware: FirmwareVersion,
    temperature: f64,
    pump_mode: u8,
    fans: FanControl,
}

impl SimulatedDevice {
    pub fn new(name: impl Into<String>, fan_count: u32) -> Self {
        Self {
            name: name.into(),
            fan_count,
            firmware: FirmwareVersion {
                major: 1,
                minor: 0,
                patch: 0,
            },
            temperature: DEFAULT_TEMPERATURE,
            pump_mode: 0,
            fans: FanControl::Pwm(50),
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_firmware(mut self, firmware: FirmwareVersion) -> Self {
        self.firmware = firmware;
        self
    }

    pub fn pump_mode(&self) -> u8 {
        self.pump_mode
    }

    pub fn fan_control(&self) -> &FanControl {
        &self.fans
    }

    fn pwm_to_rpm(pwm: u8) -> u16 {
        (u32::from(MAX_FAN_RPM) * u32::from(pwm.min(MAX_PWM)) / u32::from(MAX_PWM)) as u16
    }

    /// Duty cycle of the curve segment the current temperature falls in.
    fn curve_pwm(&self, curve: &[CurvePoint]) -> u8 {
        curve
            .iter()
            .take_while(|point| f64::from(point.temperature) <= self.temperature)
            .last()
            .or(curve.first())
            .map_or(0, |point| point.pwm)
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new("Simulated Cooler", 2)
    }
}

impl CoolingDevice for SimulatedDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn fan_count(&self) -> u32 {
        self.fan_count
    }

    fn read_pump_rpm(&mut self) -> anyhow::Result<u16> {
        Ok(match self.pump_mode {
            0 => 1800,
            1 => 2400,
            _ => 2800,
        })
    }

    fn read_fans_rpm(&mut self) -> anyhow::Result<Vec<u16>> {
        let rpm = match &self.fans {
            FanControl::Pwm(pwm) => Self::pwm_to_rpm(*pwm),
            FanControl::Rpm(rpm) => *rpm,
            FanControl::Curve(curve) => Self::pwm_to_rpm(self.curve_pwm(curve)),
        };
        Ok(vec![rpm; self.fan_count as usize])
    }

    fn read_temperature(&mut self) -> anyhow::Result<f64> {
        Ok(self.temperature)
    }

    fn read_firmware_version(&mut self) -> anyhow::Result<FirmwareVersion> {
        Ok(self.firmware)
    }

    fn write_pump_mode(&mut self, mode: u8) -> anyhow::Result<()> {
        if mode > 2 {
            bail!("unsupported pump mode {mode}");
        }
        debug!(mode, "pump mode set");
        self.pump_mode = mode;
        Ok(())
    }

    fn write_fans_pwm(&mut self, pwm: u8) -> anyhow::Result<()> {
        if pwm > MAX_PWM {
            bail!("pwm {pwm} is out of range 0-{MAX_PWM}");
        }
        debug!(pwm, "fans pwm set");
        self.fans = FanControl::Pwm(pwm);
        Ok(())
    }

    fn write_fans_rpm(&mut self, rpm: u16) -> anyhow::Result<()> {
        debug!(rpm, "fans rpm set");
        self.fans = FanControl::Rpm(rpm);
        Ok(())
    }

    fn write_fans_curve(&mut self, curve: &[CurvePoint]) -> anyhow::Result<()> {
        if curve.is_empty() {
            bail!("fan curve needs at least one point");
        }
        if let Some(point) = curve.iter().find(|point| point.pwm > MAX_PWM) {
            bail!("pwm {} is out of range 0-{MAX_PWM}", point.pwm);
        }
        if curve.windows(2).any(|pair| pair[0].temperature >= pair[1].temperature) {
            bail!("fan curve temperatures must be strictly increasing");
        }
        debug!(points = curve.len(), "fans curve set");
        self.fans = FanControl::Curve(curve.to_vec());
        Ok(())
    }
}
