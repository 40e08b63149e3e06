//! REST routes that expose a [`CoolingDevice`] over the local socket.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::device::{CoolingDevice, CurvePoint};
use crate::http::message::HttpMessage;
use crate::http::response::{Response, StatusCode};
use crate::server::listener::Server;

pub type SharedDevice = Arc<Mutex<dyn CoolingDevice + Send>>;

pub const MISSING_FAN_SETTING: &str = "Either 'rpm', 'pwm' or 'curve' needs to be set.";

#[derive(Debug, Deserialize)]
struct PumpSettings {
    mode: u8,
}

#[derive(Debug, Deserialize)]
struct FanSettings {
    rpm: Option<u16>,
    pwm: Option<u8>,
    curve: Option<Vec<CurvePoint>>,
}

fn lock(device: &SharedDevice) -> anyhow::Result<MutexGuard<'_, dyn CoolingDevice + Send + 'static>> {
    device.lock().map_err(|_| anyhow!("device state is poisoned"))
}

/// Registers `/info`, `/pump`, `/fans`, `/temperature` and `/firmware`.
pub fn register_routes(server: &mut Server, device: SharedDevice) {
    let dev = Arc::clone(&device);
    server.endpoint(&["GET"], "/info", move |_| {
        let device = lock(&dev)?;
        Ok(json!({ "name": device.name(), "fan_count": device.fan_count() }).into())
    });

    let dev = Arc::clone(&device);
    server.endpoint(&["GET"], "/pump", move |_| {
        let rpm = lock(&dev)?.read_pump_rpm()?;
        Ok(json!({ "rpm": rpm }).into())
    });

    let dev = Arc::clone(&device);
    server.endpoint(&["POST"], "/pump", move |request| {
        let settings: PumpSettings = request.json()?;
        debug!(mode = settings.mode, "pump mode requested");
        lock(&dev)?.write_pump_mode(settings.mode)?;
        Ok(json!({}).into())
    });

    let dev = Arc::clone(&device);
    server.endpoint(&["GET"], "/fans", move |_| {
        let rpm = lock(&dev)?.read_fans_rpm()?;
        Ok(json!({ "rpm": rpm }).into())
    });

    // rpm, then pwm, then curve; only the first one present is applied.
    let dev = Arc::clone(&device);
    server.endpoint(&["POST"], "/fans", move |request| {
        let settings: FanSettings = request.json()?;
        let mut device = lock(&dev)?;
        if let Some(rpm) = settings.rpm {
            debug!(rpm, "fans rpm requested");
            device.write_fans_rpm(rpm)?;
        } else if let Some(pwm) = settings.pwm {
            debug!(pwm, "fans pwm requested");
            device.write_fans_pwm(pwm)?;
        } else if let Some(curve) = settings.curve {
            debug!(points = curve.len(), "fans curve requested");
            device.write_fans_curve(&curve)?;
        } else {
            warn!("fan settings without rpm, pwm or curve");
            return Ok(Response::json(
                StatusCode::BAD_REQUEST,
                json!({ "error": MISSING_FAN_SETTING }),
            ));
        }
        Ok(json!({}).into())
    });

    let dev = Arc::clone(&device);
    server.endpoint(&["GET"], "/temperature", move |_| {
        let temperature = lock(&dev)?.read_temperature()?;
        Ok(json!({ "temperature": temperature }).into())
    });

    let dev = device;
    server.endpoint(&["GET"], "/firmware", move |_| {
        let version = lock(&dev)?.read_firmware_version()?;
        Ok(json!({ "version": version }).into())
    });
}
