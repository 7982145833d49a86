//! Conversions from the color model a light reports to display RGB.

use std::fmt;

use crate::model::{DeviceSnapshot, Hsbk};

/// Display color with an alpha channel. Device colors are always opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::opaque(0, 0, 0);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: u8::MAX }
    }

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<(u8, u8, u8)> for Rgba {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::opaque(r, g, b)
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

fn channel(unit: f64) -> u8 {
    // `as` truncates toward zero and saturates; NaN becomes 0
    (unit * 255.0).clamp(0.0, 255.0) as u8
}

/// Converts hue (degrees), saturation and brightness (percent) to RGB.
pub fn hsb_to_rgb(hue: f64, saturation: f64, brightness: f64) -> (u8, u8, u8) {
    let s = saturation / 100.0;
    let v = brightness / 100.0;
    if s == 0.0 {
        let grey = (v * 255.0).round().clamp(0.0, 255.0) as u8;
        return (grey, grey, grey);
    }

    let h = hue.rem_euclid(360.0) / 60.0;
    let hi = h.floor();
    if !(0.0..6.0).contains(&hi) {
        return (0, 0, 0);
    }
    let f = h - hi;
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);

    let (r, g, b) = match hi as u8 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        5 => (v, p, q),
        _ => return (0, 0, 0),
    };
    (channel(r), channel(g), channel(b))
}

fn clamp_channel(value: f64) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

/// Black-body approximation of a color temperature. Accurate between
/// 1000K and 40000K; values outside that range are still clamped to valid
/// channels.
pub fn kelvin_to_rgb(kelvin: u32) -> (u8, u8, u8) {
    let temp = (f64::from(kelvin) / 100.0).round();

    let r = if temp <= 66.0 {
        255
    } else {
        clamp_channel(329.698727446 * (temp - 60.0).powf(-0.1332047592))
    };

    let g = if temp <= 66.0 {
        clamp_channel(99.4708025861 * temp.ln() - 161.1195681661)
    } else {
        clamp_channel(288.1221695283 * (temp - 60.0).powf(-0.0755148492))
    };

    let b = if temp >= 66.0 {
        255
    } else if temp <= 19.0 {
        0
    } else {
        clamp_channel(138.5177312231 * (temp - 10.0).ln() - 305.0447927307)
    };

    (r, g, b)
}

/// Color a light should be drawn with: black when off, its white point when
/// unsaturated, its hue otherwise.
pub fn color_for(powered_on: bool, color: &Hsbk) -> Rgba {
    if !powered_on {
        return Rgba::BLACK;
    }
    if color.saturation == 0.0 {
        kelvin_to_rgb(color.kelvin).into()
    } else {
        hsb_to_rgb(color.hue, color.saturation, color.brightness).into()
    }
}

pub fn device_display_color(device: &DeviceSnapshot) -> Rgba {
    color_for(device.powered_on, &device.color)
}
