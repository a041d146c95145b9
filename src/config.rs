//! Tunable parameters for the simulation, its forces and the viewport.
//!
//! Every field has a default so a config file only needs the keys it changes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SourceError};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub simulation: SimulationConfig,
    pub forces: ForceConfig,
    pub radii: RadiusConfig,
    pub viewport: ViewportConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub alpha: f32,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub alpha_target: f32,
    pub velocity_decay: f32,
    /// Energy injected by the merge protocol; fixed so growth re-settles in a known number of ticks.
    pub reheat_alpha: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            alpha_min: 0.001,
            alpha_decay: 1.0 - 0.001_f32.powf(1.0 / 300.0),
            alpha_target: 0.0,
            velocity_decay: 0.4,
            reheat_alpha: 0.3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum RadialConfig {
    ByLevel { ring_spacing: f32, strength: f32 },
    ByChildCount { base: f32, per_child: f32, strength: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceConfig {
    pub link_distance: f32,
    pub link_strength: f32,
    pub charge_strength: f32,
    pub parent_charge_scale: f32,
    pub root_charge_scale: f32,
    pub distance_min: f32,
    pub distance_max: f32,
    pub theta: f32,
    pub collision_strength: f32,
    pub collision_padding: f32,
    pub center_x: f32,
    pub center_y: f32,
    pub root_center_strength: f32,
    pub gravity_strength: f32,
    pub radial: Option<RadialConfig>,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            link_distance: 60.0,
            link_strength: 1.0,
            charge_strength: -180.0,
            parent_charge_scale: 2.0,
            root_charge_scale: 3.0,
            distance_min: 1.0,
            distance_max: 250.0,
            theta: 0.9,
            collision_strength: 0.7,
            collision_padding: 4.0,
            center_x: 0.0,
            center_y: 0.0,
            root_center_strength: 0.1,
            gravity_strength: 0.01,
            radial: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadiusConfig {
    pub root: f32,
    pub parent: f32,
    pub child: f32,
}

impl Default for RadiusConfig {
    fn default() -> Self {
        Self {
            root: 16.0,
            parent: 8.0,
            child: 7.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub click_zoom: f32,
    pub transition_ms: f32,
    /// Where a focused node lands, as a fraction of the viewport size.
    pub anchor: [f32; 2],
    pub label_threshold: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.25,
            max_zoom: 12.0,
            click_zoom: 3.0,
            transition_ms: 500.0,
            anchor: [0.5, 0.5],
            label_threshold: 0.9,
        }
    }
}

fn check_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite { field, value });
    }
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

impl LayoutConfig {
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let raw = fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        check_range("simulation.alpha", sim.alpha, 0.0, 1.0)?;
        check_range("simulation.alpha_min", sim.alpha_min, 0.0, 1.0)?;
        check_range("simulation.alpha_decay", sim.alpha_decay, 0.0, 1.0)?;
        check_range("simulation.alpha_target", sim.alpha_target, 0.0, 1.0)?;
        check_range("simulation.velocity_decay", sim.velocity_decay, 0.0, 1.0)?;
        check_range("simulation.reheat_alpha", sim.reheat_alpha, 0.0, 1.0)?;

        let forces = &self.forces;
        check_range("forces.link_distance", forces.link_distance, 0.0, 10_000.0)?;
        check_range("forces.link_strength", forces.link_strength, 0.0, 2.0)?;
        check_range("forces.charge_strength", forces.charge_strength, -100_000.0, 100_000.0)?;
        check_range("forces.parent_charge_scale", forces.parent_charge_scale, 0.0, 20.0)?;
        check_range("forces.root_charge_scale", forces.root_charge_scale, 0.0, 20.0)?;
        check_range("forces.distance_min", forces.distance_min, 0.01, 1_000.0)?;
        check_range("forces.distance_max", forces.distance_max, forces.distance_min, f32::MAX)?;
        check_range("forces.theta", forces.theta, 0.0, 2.0)?;
        check_range("forces.collision_strength", forces.collision_strength, 0.0, 1.0)?;
        check_range("forces.collision_padding", forces.collision_padding, 0.0, 1_000.0)?;
        check_range("forces.center_x", forces.center_x, f32::MIN, f32::MAX)?;
        check_range("forces.center_y", forces.center_y, f32::MIN, f32::MAX)?;
        check_range("forces.root_center_strength", forces.root_center_strength, 0.0, 1.0)?;
        check_range("forces.gravity_strength", forces.gravity_strength, 0.0, 1.0)?;
        match forces.radial {
            Some(RadialConfig::ByLevel {
                ring_spacing,
                strength,
            }) => {
                check_range("forces.radial.ring_spacing", ring_spacing, 0.0, 10_000.0)?;
                check_range("forces.radial.strength", strength, 0.0, 1.0)?;
            }
            Some(RadialConfig::ByChildCount {
                base,
                per_child,
                strength,
            }) => {
                check_range("forces.radial.base", base, 0.0, 10_000.0)?;
                check_range("forces.radial.per_child", per_child, 0.0, 1_000.0)?;
                check_range("forces.radial.strength", strength, 0.0, 1.0)?;
            }
            None => {}
        }

        let radii = &self.radii;
        check_range("radii.root", radii.root, 0.5, 500.0)?;
        check_range("radii.parent", radii.parent, 0.5, 500.0)?;
        check_range("radii.child", radii.child, 0.5, 500.0)?;

        let viewport = &self.viewport;
        check_range("viewport.min_zoom", viewport.min_zoom, 0.001, 1_000.0)?;
        check_range("viewport.max_zoom", viewport.max_zoom, 0.001, 1_000.0)?;
        if viewport.min_zoom > viewport.max_zoom {
            return Err(ConfigError::ZoomBounds {
                min: viewport.min_zoom,
                max: viewport.max_zoom,
            });
        }
        check_range("viewport.click_zoom", viewport.click_zoom, 0.001, 1_000.0)?;
        check_range("viewport.transition_ms", viewport.transition_ms, 0.0, 60_000.0)?;
        check_range("viewport.anchor[0]", viewport.anchor[0], 0.0, 1.0)?;
        check_range("viewport.anchor[1]", viewport.anchor[1], 0.0, 1.0)?;
        check_range("viewport.label_threshold", viewport.label_threshold, 0.0, 1_000.0)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(LayoutConfig::default().validate(), Ok(()));
    }

    #[test]
    fn default_decay_reaches_alpha_min_in_about_three_hundred_ticks() {
        let sim = SimulationConfig::default();
        let ticks = (sim.alpha_min / sim.alpha).ln() / (1.0 - sim.alpha_decay).ln();
        assert!((ticks - 300.0).abs() < 1.0, "got {ticks}");
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config: LayoutConfig =
            serde_json::from_str(r#"{ "viewport": { "max_zoom": 6.0 } }"#).unwrap();
        assert_eq!(config.viewport.max_zoom, 6.0);
        assert_eq!(config.viewport.min_zoom, 0.25);
        assert_eq!(config.forces, ForceConfig::default());
    }

    #[test]
    fn radial_mode_is_tagged() {
        let config: LayoutConfig = serde_json::from_str(
            r#"{ "forces": { "radial": { "mode": "by_level", "ring_spacing": 80.0, "strength": 0.2 } } }"#,
        )
        .unwrap();
        assert_eq!(
            config.forces.radial,
            Some(RadialConfig::ByLevel {
                ring_spacing: 80.0,
                strength: 0.2
            })
        );
    }

    #[test]
    fn inverted_zoom_bounds_are_rejected() {
        let mut config = LayoutConfig::default();
        config.viewport.min_zoom = 8.0;
        config.viewport.max_zoom = 2.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZoomBounds { min: 8.0, max: 2.0 })
        );
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let mut config = LayoutConfig::default();
        config.simulation.velocity_decay = f32::NAN;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotFinite {
                field: "simulation.velocity_decay",
                ..
            })
        ));
    }
}
