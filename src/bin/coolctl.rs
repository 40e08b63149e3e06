//! coolctl - command-line client for coold.

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use coolipc::config::Config;
use coolipc::device::CurvePoint;
use coolipc::http::message::HttpMessage;
use coolipc::{Client, ClientError, Request, Response};

const MAX_ATTEMPTS: u32 = 50;
const RETRY_DELAY: Duration = Duration::from_millis(100);
const EXIT_REQUEST_FAILED: u8 = 2;

#[derive(Parser)]
#[command(name = "coolctl", version, about = "Control a running coold", long_about = None)]
struct Cli {
    /// Daemon socket (defaults to the configured path).
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Show raw output in form of JSON.
    #[arg(short, long)]
    json: bool,

    /// Increase log verbosity.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Device name and fan count.
    Info,
    /// Read the pump speed, or set the pump mode.
    Pump { mode: Option<u8> },
    /// Read fan speeds, or set them.
    Fans {
        #[command(subcommand)]
        setting: Option<FanSetting>,
    },
    /// Coolant temperature.
    Temp,
    /// Firmware version.
    Firmware,
}

#[derive(Subcommand)]
enum FanSetting {
    /// Fixed duty cycle in percent.
    Pwm { value: u8 },
    /// Fixed speed.
    Rpm { value: u16 },
    /// Temperature curve as <TEMP>-<PWM> points.
    Curve {
        #[arg(required = true, value_parser = parse_curve_point)]
        points: Vec<CurvePoint>,
    },
}

fn parse_curve_point(text: &str) -> Result<CurvePoint, String> {
    let format_error = || "fan curve points need the format <TEMP>-<PWM>".to_string();
    let (temperature, pwm) = text.split_once('-').ok_or_else(format_error)?;
    Ok(CurvePoint {
        temperature: temperature.trim().parse().map_err(|_| format_error())?,
        pwm: pwm.trim().parse().map_err(|_| format_error())?,
    })
}

impl Command {
    fn method_and_resource(&self) -> (&'static str, &'static str) {
        match self {
            Command::Info => ("GET", "/info"),
            Command::Pump { mode: None } => ("GET", "/pump"),
            Command::Pump { mode: Some(_) } => ("POST", "/pump"),
            Command::Fans { setting: None } => ("GET", "/fans"),
            Command::Fans { setting: Some(_) } => ("POST", "/fans"),
            Command::Temp => ("GET", "/temperature"),
            Command::Firmware => ("GET", "/firmware"),
        }
    }

    fn payload(&self) -> Option<Value> {
        match self {
            Command::Pump { mode: Some(mode) } => Some(json!({ "mode": mode })),
            Command::Fans { setting: Some(FanSetting::Pwm { value }) } => Some(json!({ "pwm": value })),
            Command::Fans { setting: Some(FanSetting::Rpm { value }) } => Some(json!({ "rpm": value })),
            Command::Fans { setting: Some(FanSetting::Curve { points }) } => Some(json!({ "curve": points })),
            _ => None,
        }
    }
}

/// Retries transport faults; the daemon may still be starting up.
fn send_with_retry(client: &Client, request: &Request) -> Result<Response> {
    let mut attempt = 1;
    loop {
        match client.send(request.clone()) {
            Ok(response) => return Ok(response),
            Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                debug!(attempt, error = %e, "request failed, retrying");
                attempt += 1;
                thread::sleep(RETRY_DELAY);
            }
            Err(e @ ClientError::Transport(_)) => {
                return Err(anyhow!(e)).with_context(|| {
                    format!("no answer from {} after {attempt} attempts", client.socket_path().display())
                });
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn render_plain(value: &Value, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                match value {
                    Value::Object(_) => {
                        out.push_str(&format!("{pad}{key}:\n"));
                        render_plain(value, indent + 1, out);
                    }
                    _ => {
                        out.push_str(&format!("{pad}{key}: "));
                        render_plain(value, 0, out);
                    }
                }
            }
        }
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(Value::to_string).collect();
            out.push_str(&format!("{pad}{}\n", items.join(", ")));
        }
        Value::String(text) => out.push_str(&format!("{pad}{text}\n")),
        other => out.push_str(&format!("{pad}{other}\n")),
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = Config::load()?;
    if let Some(socket) = cli.socket {
        config.set_socket_path(socket);
    }
    let client = Client::from_config(&config.client);

    let (method, resource) = cli.command.method_and_resource();
    let request = match cli.command.payload() {
        Some(payload) => Request::builder(method, resource).json(&payload)?.build(),
        None => Request::new(method, resource),
    };
    let response = send_with_retry(&client, &request)?;

    if !response.status.is_success() {
        eprintln!("Request failed! ({} {})\n\n{}", response.status, response.reason(), response.text());
        return Ok(ExitCode::from(EXIT_REQUEST_FAILED));
    }

    let data: Value = if response.body().is_empty() {
        Value::Null
    } else {
        response.json().context("daemon sent a body that is not JSON")?
    };
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        let mut out = String::new();
        render_plain(&data, 0, &mut out);
        if out.is_empty() {
            out.push_str("OK\n");
        }
        print!("{out}");
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose > 0 { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_points_use_dash_format() {
        assert_eq!(
            parse_curve_point("30-40").unwrap(),
            CurvePoint { temperature: 30, pwm: 40 }
        );
        assert!(parse_curve_point("30:40").is_err());
        assert!(parse_curve_point("300-40").is_err());
    }

    #[test]
    fn plain_rendering_nests_objects() {
        let mut out = String::new();
        render_plain(&json!({"version": {"major": 1}, "rpm": [1, 2]}), 0, &mut out);
        assert_eq!(out, "rpm: 1, 2\nversion:\n  major: 1\n");
    }
}
