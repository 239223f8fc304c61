//! Display colors for projects and tests.
//!
//! Colors are `#rrggbb` strings derived from HSL. The hue encodes the
//! technology (or, for other technologies, the language), so projects of
//! the same stack share a hue. Test colors vary lightness by
//! classification and saturation by database use.

use crate::models::{Classification, Test};
use crate::project::Project;
use crate::technology::Technology;

/// Color of projects that have not been classified.
pub const UNCLASSIFIED_COLOR: &str = "#808080";

const JVM_HUE: f64 = 25.0;
const DOT_NET_HUE: f64 = 270.0;

/// Color of a project.
pub fn project_color(project: &Project) -> String {
    match project_hue(project) {
        Some(hue) => hsl_to_hex(hue, 65.0, 50.0),
        None => UNCLASSIFIED_COLOR.to_string(),
    }
}

/// Color of one of the project's tests.
pub fn test_color(project: &Project, test: &Test) -> String {
    let Some(hue) = project_hue(project) else {
        return UNCLASSIFIED_COLOR.to_string();
    };

    let lightness = match test.classification {
        Some(Classification::Fullstack) => 35.0,
        Some(Classification::Platform) => 65.0,
        _ => 50.0,
    };
    let saturation = if test.effective_database().is_some() {
        65.0
    } else {
        45.0
    };

    hsl_to_hex(hue, saturation, lightness)
}

fn project_hue(project: &Project) -> Option<f64> {
    match project.technology? {
        Technology::Jvm => Some(JVM_HUE),
        Technology::DotNet => Some(DOT_NET_HUE),
        Technology::Other => Some(language_hue(project.language.as_deref().unwrap_or(""))),
    }
}

/// Stable hue for a language name (FNV-1a).
fn language_hue(language: &str) -> f64 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in language.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    f64::from(hash % 360)
}

/// Convert HSL (degrees, percent, percent) to a hex color.
pub fn hsl_to_hex(hue: f64, saturation: f64, lightness: f64) -> String {
    let h = hue.rem_euclid(360.0) / 60.0;
    let s = (saturation / 100.0).clamp(0.0, 1.0);
    let l = (lightness / 100.0).clamp(0.0, 1.0);

    let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
    let m = l - chroma / 2.0;

    let (r, g, b) = match h as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };

    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    format!("#{:02x}{:02x}{:02x}", channel(r), channel(g), channel(b))
}
