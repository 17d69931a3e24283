use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GalaxyError, GalaxyResult};

pub const DEFAULT_PALETTE: [&str; 8] = [
    "#00ffcc", "#ff0055", "#0077ff", "#ffcc00", "#9900ff", "#ff6600", "#00ff00", "#ffffff",
];

/// Largest anchor extent the registry samples from. Sampling needs the full
/// width `2 * extent` to stay finite.
pub const MAX_CENTER_EXTENT: f32 = 1.0e30;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub registry: RegistryConfig,
    pub cluster: ClusterConfig,
    pub shell: ShellConfig,
    pub physics: PhysicsConfig,
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> GalaxyResult<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects numeric settings the layout cannot work with: anything
    /// non-finite, and anchor extents too large to sample from.
    pub fn validate(&self) -> GalaxyResult<()> {
        let physics = &self.physics;
        let values = [
            ("registry.center_extent", self.registry.center_extent),
            ("cluster.strength", self.cluster.strength),
            ("shell.base_radius", self.shell.base_radius),
            ("shell.per_member_radius", self.shell.per_member_radius),
            ("physics.charge_strength", physics.charge_strength),
            ("physics.charge_distance_min", physics.charge_distance_min),
            ("physics.charge_distance_max", physics.charge_distance_max),
            ("physics.theta", physics.theta),
            ("physics.collide_margin", physics.collide_margin),
            ("physics.collide_strength", physics.collide_strength),
            ("physics.link_distance", physics.link_distance),
            ("physics.link_strength_scale", physics.link_strength_scale),
            ("physics.velocity_decay", physics.velocity_decay),
            ("physics.alpha_min", physics.alpha_min),
            ("physics.alpha_target", physics.alpha_target),
            ("physics.initial_radius", physics.initial_radius),
        ];
        for (field, value) in values {
            if !value.is_finite() {
                return Err(GalaxyError::InvalidConfig {
                    field,
                    reason: format!("{value} is not a finite number"),
                });
            }
        }

        if self.registry.center_extent.abs() > MAX_CENTER_EXTENT {
            return Err(GalaxyError::InvalidConfig {
                field: "registry.center_extent",
                reason: format!("must not exceed {MAX_CENTER_EXTENT}"),
            });
        }
        Ok(())
    }

    pub fn load(path: &Path) -> GalaxyResult<Self> {
        let raw = fs::read_to_string(path).map_err(|error| GalaxyError::io(path, error))?;
        Self::from_toml_str(&raw)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub palette: Vec<String>,
    /// Half side of the cube system anchors are drawn from.
    pub center_extent: f32,
    pub seed: Option<u64>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            palette: DEFAULT_PALETTE.iter().map(|color| (*color).to_owned()).collect(),
            center_extent: 750.0,
            seed: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub strength: f32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self { strength: 0.08 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub base_radius: f32,
    pub per_member_radius: f32,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            base_radius: 120.0,
            per_member_radius: 15.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Negative values repel.
    pub charge_strength: f32,
    pub charge_distance_min: f32,
    pub charge_distance_max: f32,
    pub theta: f32,
    pub collide_margin: f32,
    pub collide_strength: f32,
    pub link_distance: f32,
    pub link_strength_scale: f32,
    pub velocity_decay: f32,
    pub alpha_min: f32,
    pub alpha_target: f32,
    pub initial_radius: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            charge_strength: -300.0,
            charge_distance_min: 1.0,
            charge_distance_max: 500.0,
            theta: 0.9,
            collide_margin: 15.0,
            collide_strength: 1.0,
            link_distance: 30.0,
            link_strength_scale: 1.0,
            velocity_decay: 0.4,
            alpha_min: 0.001,
            alpha_target: 0.0,
            initial_radius: 10.0,
        }
    }
}

impl PhysicsConfig {
    /// Per-tick cooling rate that takes alpha from 1 to `alpha_min` in 300 ticks.
    pub fn alpha_decay(&self) -> f32 {
        1.0 - self.alpha_min.clamp(1e-6, 1.0).powf(1.0 / 300.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.registry.palette.len(), 8);
        assert_eq!(config.shell.base_radius, 120.0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [cluster]
            strength = 0.05

            [registry]
            seed = 7
            center_extent = 100.0
            "#,
        )
        .unwrap();

        assert_eq!(config.cluster.strength, 0.05);
        assert_eq!(config.registry.seed, Some(7));
        assert_eq!(config.registry.center_extent, 100.0);
        assert_eq!(config.registry.palette[0], "#00ffcc");
        assert_eq!(config.physics.charge_strength, -300.0);
    }

    #[test]
    fn rejects_wrong_types() {
        let error = EngineConfig::from_toml_str("[cluster]\nstrength = \"strong\"").unwrap_err();
        assert!(matches!(error, GalaxyError::Config(_)));
    }

    #[test]
    fn rejects_unusable_center_extent() {
        for raw in [
            "[registry]\ncenter_extent = inf",
            "[registry]\ncenter_extent = -inf",
            "[registry]\ncenter_extent = nan",
            "[registry]\ncenter_extent = 1e39",
            "[registry]\ncenter_extent = 3e38",
        ] {
            let error = EngineConfig::from_toml_str(raw).unwrap_err();
            assert!(
                matches!(
                    error,
                    GalaxyError::InvalidConfig {
                        field: "registry.center_extent",
                        ..
                    }
                ),
                "{raw} gave {error}"
            );
        }
    }

    #[test]
    fn rejects_non_finite_physics() {
        let error = EngineConfig::from_toml_str("[physics]\ntheta = nan").unwrap_err();
        assert!(matches!(
            error,
            GalaxyError::InvalidConfig {
                field: "physics.theta",
                ..
            }
        ));
    }

    #[test]
    fn alpha_decay_matches_three_hundred_tick_schedule() {
        let physics = PhysicsConfig::default();
        let mut alpha = 1.0_f32;
        for _ in 0..300 {
            alpha += (physics.alpha_target - alpha) * physics.alpha_decay();
        }
        assert!((alpha - physics.alpha_min).abs() < 1e-4);
    }
}
