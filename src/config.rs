//! Optional TOML configuration with per-scene overrides.
//!
//! ```toml
//! seed = 7
//! output_dir = "captures"
//!
//! [scenes.sphere]
//! count = 256
//! size = 0.3
//! duration_secs = 4.0
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Result, SceneKind, SceneSettings};

pub const DEFAULT_SEED: u64 = 0x5EED;

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub seed: u64,
    pub output_dir: PathBuf,
    pub scenes: SceneOverrides,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneOverrides {
    pub plane: Option<SceneOverride>,
    pub funnel: Option<SceneOverride>,
    pub grid: Option<SceneOverride>,
    pub sphere: Option<SceneOverride>,
    pub mobius: Option<SceneOverride>,
}

impl SceneOverrides {
    pub fn get(&self, kind: SceneKind) -> Option<&SceneOverride> {
        match kind {
            SceneKind::Plane => self.plane.as_ref(),
            SceneKind::Funnel => self.funnel.as_ref(),
            SceneKind::Grid => self.grid.as_ref(),
            SceneKind::Sphere => self.sphere.as_ref(),
            SceneKind::Mobius => self.mobius.as_ref(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneOverride {
    pub count: Option<u32>,
    pub size: Option<f32>,
    pub speed: Option<f32>,
    pub show_points: Option<bool>,
    pub duration_secs: Option<f32>,
    pub fps: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            output_dir: PathBuf::from("."),
            scenes: SceneOverrides::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Defaults for `kind` with this configuration's overrides applied.
    pub fn settings_for(&self, kind: SceneKind) -> SceneSettings {
        let mut settings = SceneSettings::new(kind);
        let Some(o) = self.scenes.get(kind) else {
            return settings;
        };

        if let Some(count) = o.count {
            settings.set_count(count);
            if settings.count != count {
                log::warn!(
                    "{} count {count} adjusted to {}",
                    kind.name(),
                    settings.count
                );
            }
        }
        if let Some(size) = o.size {
            settings.size = size.clamp(0.0, 1.0);
        }
        if let Some(speed) = o.speed {
            settings.speed = speed.clamp(0.0, 1.0);
        }
        if let Some(show_points) = o.show_points {
            settings.show_points = show_points;
        }
        let default_duration = settings.capture.duration_secs;
        if let Some(duration) = o.duration_secs {
            settings.capture.duration_secs = duration;
        }
        if let Some(fps) = o.fps {
            settings.capture.fps = fps;
        }
        let requested = settings.capture;
        settings.capture = requested.bounded(default_duration);
        if settings.capture != requested {
            log::warn!(
                "{} capture of {}s at {} fps adjusted to {}s at {} fps",
                kind.name(),
                requested.duration_secs,
                requested.fps,
                settings.capture.duration_secs,
                settings.capture.fps
            );
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.seed, DEFAULT_SEED);
        assert_eq!(config.output_dir, PathBuf::from("."));
        for kind in SceneKind::ALL {
            assert_eq!(config.settings_for(kind), SceneSettings::new(kind));
        }
    }

    #[test]
    fn overrides_apply_per_scene() {
        let config = Config::from_toml_str(
            r#"
            seed = 9
            output_dir = "out"

            [scenes.sphere]
            count = 260
            size = 0.25
            fps = 30

            [scenes.grid]
            show_points = true
            speed = 4.0
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, 9);
        let sphere = config.settings_for(SceneKind::Sphere);
        assert_eq!(sphere.count, 256);
        assert_eq!(sphere.size, 0.25);
        assert_eq!(sphere.capture.fps, 30);

        let grid = config.settings_for(SceneKind::Grid);
        assert!(grid.show_points);
        assert_eq!(grid.speed, 1.0);

        assert_eq!(config.settings_for(SceneKind::Plane), SceneSettings::new(SceneKind::Plane));
    }

    #[test]
    fn capture_overrides_are_bounded() {
        let config = Config::from_toml_str(
            r#"
            [scenes.grid]
            duration_secs = inf

            [scenes.sphere]
            fps = 4000000000

            [scenes.mobius]
            duration_secs = -3.0

            [scenes.plane]
            fps = 2000
            "#,
        )
        .unwrap();

        let grid = config.settings_for(SceneKind::Grid).capture;
        assert_eq!(grid.duration_secs, 10.0);
        assert_eq!(grid.frame_count(), 200);

        let sphere = config.settings_for(SceneKind::Sphere).capture;
        assert_eq!(sphere.fps, crate::capture::MAX_FPS);
        assert_eq!(sphere.frame_count(), 500);

        let mobius = config.settings_for(SceneKind::Mobius).capture;
        assert_eq!(mobius.duration_secs, 0.0);
        assert_eq!(mobius.frame_count(), 0);

        let plane = config.settings_for(SceneKind::Plane).capture;
        assert_eq!(plane.frame_count(), 200);
        assert!(plane.schedule().all(|frame| frame.delay_ms == 10));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(Config::from_toml_str("colour = 1"), Err(Error::Config(_))));
        assert!(matches!(
            Config::from_toml_str("[scenes.sphere]\nradius = 1.0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[scenes.torus]\ncount = 1"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Config::load(Path::new("/nonexistent/particle_scenes.toml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
