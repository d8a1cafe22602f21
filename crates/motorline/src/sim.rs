//! In-process simulated device for `motorline serve`.
//!
//! Axes track their setpoints instantly, so feedback reflects the last command.
//! Properties are plain JSON values loaded from the configuration file.

use std::collections::BTreeMap;
use std::f32::consts::{FRAC_PI_2, TAU};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use motorline_command::{
    AxisControl, Device, DeviceError, DeviceIdentity, DispatchConfig, Endpoint, PropertyError,
};
use motorline_frame::{FrameConfig, DEFAULT_MAX_LINE_LENGTH, MAX_LINE_LENGTH_LIMIT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::exit::{io_error, json_error, CliError, CliResult};

/// Encoder resolution of every simulated axis.
pub const COUNTS_PER_REV: f32 = 8192.0;

/// Contents of the `--config` JSON file. Every field is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub axis_count: usize,
    pub identity: DeviceIdentity,
    pub frame: FrameSettings,
    pub dispatch: DispatchConfig,
    pub properties: BTreeMap<String, PropertySpec>,
    /// Where `s` writes the current property values. Without it, saving fails.
    pub save_path: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        let mut properties = BTreeMap::new();
        properties.insert(
            "vbus_voltage".to_string(),
            PropertySpec::new(Value::from(24.0), Access::ReadOnly),
        );
        properties.insert(
            "serial_number".to_string(),
            PropertySpec::new(Value::from("000000000000"), Access::ReadOnly),
        );
        for axis in 0..2 {
            properties.insert(
                format!("axis{axis}.requested_state"),
                PropertySpec::new(Value::from(1), Access::ReadWrite),
            );
            properties.insert(
                format!("axis{axis}.controller.config.vel_limit"),
                PropertySpec::new(Value::from(20000.0), Access::ReadWrite),
            );
        }
        Self {
            axis_count: 2,
            identity: DeviceIdentity::default(),
            frame: FrameSettings::default(),
            dispatch: DispatchConfig::default(),
            properties,
            save_path: None,
        }
    }
}

impl SimConfig {
    pub fn load(path: &Path) -> CliResult<Self> {
        let file = File::open(path)
            .map_err(|err| io_error(&format!("open {}", path.display()), err))?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|err| json_error(&format!("parse {}", path.display()), err))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CliResult<()> {
        let max = self.frame.max_line_length;
        if !(1..=MAX_LINE_LENGTH_LIMIT).contains(&max) {
            return Err(CliError::usage(format!(
                "frame.max_line_length must be within 1..={MAX_LINE_LENGTH_LIMIT}, got {max}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct FrameSettings {
    pub max_line_length: usize,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl From<FrameSettings> for FrameConfig {
    fn from(settings: FrameSettings) -> Self {
        FrameConfig {
            max_line_length: settings.max_line_length,
        }
    }
}

/// String access allowed on a property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    #[default]
    ReadWrite,
    ReadOnly,
    WriteOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySpec {
    pub value: Value,
    #[serde(default)]
    pub access: Access,
}

impl PropertySpec {
    pub fn new(value: Value, access: Access) -> Self {
        Self { value, access }
    }
}

impl Endpoint for PropertySpec {
    fn read_string(&self) -> Result<String, PropertyError> {
        if self.access == Access::WriteOnly {
            return Err(PropertyError::Unsupported);
        }
        match &self.value {
            Value::String(text) => Ok(text.clone()),
            Value::Number(number) => Ok(number.to_string()),
            Value::Bool(flag) => Ok(if *flag { "1" } else { "0" }.to_string()),
            _ => Err(PropertyError::Unsupported),
        }
    }

    fn write_string(&mut self, text: &str) -> Result<(), PropertyError> {
        if self.access == Access::ReadOnly {
            return Err(PropertyError::Unsupported);
        }
        let invalid = || PropertyError::InvalidValue(text.to_string());
        self.value = match &self.value {
            Value::String(_) => Value::from(text),
            Value::Bool(_) => match text {
                "1" | "true" => Value::Bool(true),
                "0" | "false" => Value::Bool(false),
                _ => return Err(invalid()),
            },
            Value::Number(number) if number.is_f64() => {
                let parsed = text.parse::<f64>().map_err(|_| invalid())?;
                serde_json::Number::from_f64(parsed)
                    .map(Value::Number)
                    .ok_or_else(invalid)?
            }
            Value::Number(_) => Value::from(text.parse::<i64>().map_err(|_| invalid())?),
            _ => return Err(PropertyError::Unsupported),
        };
        Ok(())
    }
}

/// Simulated axis with ideal tracking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimAxis {
    pub index: usize,
    pub pos_setpoint: f32,
    pub vel_setpoint: f32,
    pub current_setpoint: f32,
    pub vel_ff: f32,
    pub current_ff: f32,
    pub vel_limit: Option<f32>,
    pub current_limit: Option<f32>,
    pub coupled_setpoints: (f32, f32),
    pub coupled_gains: [f32; 4],
    pub pos_estimate: f32,
    pub vel_estimate: f32,
    pub watchdog_feeds: u64,
}

impl SimAxis {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    fn rad_to_encoder(angle: f32) -> f32 {
        angle / TAU * COUNTS_PER_REV
    }
}

impl AxisControl for SimAxis {
    fn set_pos_setpoint(&mut self, pos: f32, vel_ff: f32, current_ff: f32) {
        self.pos_setpoint = pos;
        self.vel_ff = vel_ff;
        self.current_ff = current_ff;
        self.pos_estimate = pos;
    }

    fn assign_pos_setpoint(&mut self, pos: f32) {
        self.pos_setpoint = pos;
        self.pos_estimate = pos;
    }

    fn set_vel_limit(&mut self, vel_limit: f32) {
        self.vel_limit = Some(vel_limit);
    }

    fn set_current_limit(&mut self, current_limit: f32) {
        self.current_limit = Some(current_limit);
    }

    fn set_vel_setpoint(&mut self, vel: f32, current_ff: f32) {
        self.vel_setpoint = vel;
        self.current_ff = current_ff;
        self.vel_estimate = vel;
    }

    fn set_current_setpoint(&mut self, current: f32) {
        self.current_setpoint = current;
    }

    fn move_to_pos(&mut self, goal: f32) {
        self.pos_setpoint = goal;
        self.pos_estimate = goal;
    }

    // Axis 0 follows alpha = theta + gamma, axis 1 follows beta = theta - gamma,
    // offset by the quarter turn the feedback path adds back.
    fn set_coupled_setpoints(&mut self, theta: f32, gamma: f32) {
        self.coupled_setpoints = (theta, gamma);
        let angle = match self.index {
            0 => theta + gamma - FRAC_PI_2,
            _ => theta - gamma + FRAC_PI_2,
        };
        self.pos_estimate = Self::rad_to_encoder(angle);
    }

    fn set_coupled_gains(&mut self, kp_theta: f32, kd_theta: f32, kp_gamma: f32, kd_gamma: f32) {
        self.coupled_gains = [kp_theta, kd_theta, kp_gamma, kd_gamma];
    }

    fn pos_estimate(&self) -> f32 {
        self.pos_estimate
    }

    fn vel_estimate(&self) -> f32 {
        self.vel_estimate
    }

    fn encoder_to_rad(&self, counts: f32) -> f32 {
        counts / COUNTS_PER_REV * TAU
    }

    fn watchdog_feed(&mut self) {
        self.watchdog_feeds += 1;
    }
}

#[derive(Debug)]
pub struct SimDevice {
    axes: Vec<SimAxis>,
    properties: BTreeMap<String, PropertySpec>,
    identity: DeviceIdentity,
    save_path: Option<PathBuf>,
}

impl SimDevice {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            axes: (0..config.axis_count).map(SimAxis::new).collect(),
            properties: config.properties.clone(),
            identity: config.identity.clone(),
            save_path: config.save_path.clone(),
        }
    }
}

impl Device for SimDevice {
    type Axis = SimAxis;

    fn axes(&self) -> &[SimAxis] {
        &self.axes
    }

    fn axes_mut(&mut self) -> &mut [SimAxis] {
        &mut self.axes
    }

    fn endpoint(&mut self, name: &str) -> Option<&mut dyn Endpoint> {
        self.properties
            .get_mut(name)
            .map(|property| property as &mut dyn Endpoint)
    }

    fn save_configuration(&mut self) -> Result<(), DeviceError> {
        let path = self
            .save_path
            .as_ref()
            .ok_or_else(|| DeviceError::Persistence("no save_path configured".to_string()))?;
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &self.properties)
            .map_err(|err| DeviceError::Persistence(err.to_string()))?;
        writer.flush()?;
        info!(path = %path.display(), count = self.properties.len(), "configuration saved");
        Ok(())
    }

    fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }
}
