pub mod simulated;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

use crate::model::{Hsbk, Roster, Serial};

pub use simulated::SimulatedTransport;

/// Transition time used when a command does not ask for one.
pub const DEFAULT_TRANSITION: Duration = Duration::from_millis(1);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Device transport unreachable: {0}")]
    Unreachable(String),
    #[error("Device transport timed out after {0:?}")]
    TimedOut(Duration),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Unknown device {0}")]
    UnknownDevice(Serial),
    #[error("Color change for {0} sets no component")]
    EmptyColorEdit(Serial),
}

/// Partial color change; `None` fields are left as they are on the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorEdit {
    pub hue: Option<f64>,
    pub saturation: Option<f64>,
    pub brightness: Option<f64>,
    pub kelvin: Option<u32>,
}

impl ColorEdit {
    pub const HUE_RANGE: (f64, f64) = (0.0, 360.0);
    pub const SATURATION_RANGE: (f64, f64) = (0.0, 100.0);
    pub const BRIGHTNESS_RANGE: (f64, f64) = (1.0, 100.0);
    pub const KELVIN_RANGE: (u32, u32) = (1500, 9000);

    pub fn hue(hue: f64) -> Self {
        Self {
            hue: Some(hue),
            ..Default::default()
        }
    }

    pub fn saturation(saturation: f64) -> Self {
        Self {
            saturation: Some(saturation),
            ..Default::default()
        }
    }

    pub fn brightness(brightness: f64) -> Self {
        Self {
            brightness: Some(brightness),
            ..Default::default()
        }
    }

    pub fn kelvin(kelvin: u32) -> Self {
        Self {
            kelvin: Some(kelvin),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hue.is_none()
            && self.saturation.is_none()
            && self.brightness.is_none()
            && self.kelvin.is_none()
    }

    /// Restricts every present field to the range a light control accepts.
    pub fn clamped(self) -> Self {
        let clamp = |v: f64, (lo, hi): (f64, f64)| v.clamp(lo, hi);
        Self {
            hue: self.hue.map(|v| clamp(v, Self::HUE_RANGE)),
            saturation: self.saturation.map(|v| clamp(v, Self::SATURATION_RANGE)),
            brightness: self.brightness.map(|v| clamp(v, Self::BRIGHTNESS_RANGE)),
            kelvin: self
                .kelvin
                .map(|v| v.clamp(Self::KELVIN_RANGE.0, Self::KELVIN_RANGE.1)),
        }
    }

    pub fn apply_to(&self, color: &mut Hsbk) {
        if let Some(hue) = self.hue {
            color.hue = hue;
        }
        if let Some(saturation) = self.saturation {
            color.saturation = saturation;
        }
        if let Some(brightness) = self.brightness {
            color.brightness = brightness;
        }
        if let Some(kelvin) = self.kelvin {
            color.kelvin = kelvin;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceCommand {
    SetPower { on: bool },
    SetColor { edit: ColorEdit, transition: Duration },
}

impl DeviceCommand {
    pub fn power(on: bool) -> Self {
        Self::SetPower { on }
    }

    pub fn color(edit: ColorEdit) -> Self {
        Self::SetColor {
            edit,
            transition: DEFAULT_TRANSITION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscoveryStatus {
    #[default]
    Discovering,
    Settled,
}

/// Device-side collaborator: discovery, state queries and control.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    async fn fetch_roster(&self) -> Result<Roster, TransportError>;

    async fn send_command(&self, serial: Serial, command: DeviceCommand)
    -> Result<(), CommandError>;

    /// Readiness channel for initial discovery, when the transport has one.
    fn discovery_status(&self) -> Option<watch::Receiver<DiscoveryStatus>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_edit_clamps_to_control_ranges() {
        let edit = ColorEdit {
            hue: Some(400.0),
            saturation: Some(-5.0),
            brightness: Some(0.0),
            kelvin: Some(12_000),
        }
        .clamped();
        assert_eq!(edit.hue, Some(360.0));
        assert_eq!(edit.saturation, Some(0.0));
        assert_eq!(edit.brightness, Some(1.0));
        assert_eq!(edit.kelvin, Some(9000));
        assert_eq!(ColorEdit::kelvin(1000).clamped().kelvin, Some(1500));
    }

    #[test]
    fn test_color_edit_only_touches_present_fields() {
        let mut color = Hsbk {
            hue: 10.0,
            saturation: 20.0,
            brightness: 30.0,
            kelvin: 4000,
        };
        ColorEdit::brightness(75.0).apply_to(&mut color);
        assert_eq!(
            color,
            Hsbk {
                hue: 10.0,
                saturation: 20.0,
                brightness: 75.0,
                kelvin: 4000,
            }
        );
        assert!(ColorEdit::default().is_empty());
        assert!(!ColorEdit::hue(1.0).is_empty());
    }
}
