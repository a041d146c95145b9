use std::f32::consts::TAU;

use eframe::egui::{Color32, Vec2, vec2};

use crate::error::GraphError;

/// Below this length a vector is treated as zero and replaced by a fallback direction.
pub const MIN_DISTANCE: f32 = 1e-4;

const FNV1A_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV1A_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a, so seed positions do not depend on the std hasher.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV1A_OFFSET, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV1A_PRIME)
    })
}

pub fn stable_pair(id: &str) -> (f32, f32) {
    let hash = fnv1a(id.as_bytes());

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

/// Unit vector pointing from node `from` toward node `to` when both sit on the same spot.
///
/// Antisymmetric in its arguments so a coincident pair is pushed apart instead of
/// drifting together.
pub fn fallback_direction(from: usize, to: usize) -> Vec2 {
    let (low, high) = if from <= to { (from, to) } else { (to, from) };
    let angle = ((low as f32) * 0.618_034 + (high as f32) * 0.414_214 + 0.11) * TAU;
    let direction = vec2(angle.cos(), angle.sin());
    if from <= to { direction } else { -direction }
}

pub fn parse_hex_color(value: &str) -> Result<Color32, GraphError> {
    let trimmed = value.trim();
    let color = Color32::from_hex(trimmed).map_err(|_| GraphError::InvalidColor(value.to_owned()))?;
    Ok(color)
}

pub fn format_hex_color(color: Color32) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r(), color.g(), color.b())
}

/// Lightens a color the way d3's `color.brighter(k)` does.
pub fn brighter(color: Color32, k: f32) -> Color32 {
    let factor = (1.0 / 0.7_f32).powf(k);
    let scale = |channel: u8| ((channel as f32 * factor).round()).clamp(0.0, 255.0) as u8;
    Color32::from_rgb(scale(color.r()), scale(color.g()), scale(color.b()))
}
