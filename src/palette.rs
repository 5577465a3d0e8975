// Fixed chart colors and the deterministic pie palette

use plotters::style::{Color, HSLColor, RGBColor};
use std::fmt;

/// Fill for bars, scatter points and the area series (#a06ff8)
pub const ACCENT: RGBColor = RGBColor(0xa0, 0x6f, 0xf8);

/// Stroke for the line series (#82ca9d)
pub const LINE_STROKE: RGBColor = RGBColor(0x82, 0xca, 0x9d);

/// Hue step between consecutive pie slices, in degrees
pub const PIE_HUE_STEP: u32 = 40;
pub const PIE_SATURATION: u8 = 70;
pub const PIE_LIGHTNESS: u8 = 60;

/// A color in HSL space: hue in degrees, saturation and lightness in percent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HslFill {
    pub hue: u32,
    pub saturation: u8,
    pub lightness: u8,
}

impl HslFill {
    pub fn to_rgb(&self) -> RGBColor {
        let hsl = HSLColor(
            f64::from(self.hue % 360) / 360.0,
            f64::from(self.saturation) / 100.0,
            f64::from(self.lightness) / 100.0,
        );
        let (r, g, b) = hsl.to_backend_color().rgb;
        RGBColor(r, g, b)
    }
}

impl fmt::Display for HslFill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hsl({}, {}%, {}%)", self.hue, self.saturation, self.lightness)
    }
}

/// Hue of the pie slice at `index`; cycles through 9 hues
pub fn pie_hue(index: usize) -> u32 {
    let distinct = (360 / PIE_HUE_STEP) as usize;
    (index % distinct) as u32 * PIE_HUE_STEP
}

/// Fill of the pie slice at `index`. Depends only on the index, never on data.
pub fn pie_color(index: usize) -> HslFill {
    HslFill {
        hue: pie_hue(index),
        saturation: PIE_SATURATION,
        lightness: PIE_LIGHTNESS,
    }
}
