// Runtime configuration: TOML file, defaults, validation.
//
// Everything that can make the pipeline degenerate (zero output, inverted
// scale bounds, an output bigger than the monitor, ...) is rejected here,
// before the tick loop starts.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::dwell::DwellConfig;
use crate::error::Error;
use crate::smoothing::SmoothingParams;
use crate::types::{Bounds, Size};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub window: WindowConfig,
    pub smoothing: SmoothingConfig,
    pub dwell: DwellSettings,
    pub positioner: PositionerConfig,
    pub scale: ScaleConfig,
    pub input: InputConfig,
    pub timing: TimingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub topmost: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { width: 800, height: 600, topmost: true }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmoothingConfig {
    pub history_size: usize,
    pub dead_zone: u32,
    pub max_speed: u32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self { history_size: 3, dead_zone: 20, max_speed: 200 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DwellSettings {
    pub enabled: bool,
    pub radius: f64,
    pub hold_ms: u64,
}

impl Default for DwellSettings {
    fn default() -> Self {
        Self { enabled: false, radius: 100.0, hold_ms: 500 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PositionerConfig {
    pub move_dead_zone: u32,
}

impl Default for PositionerConfig {
    fn default() -> Self {
        Self { move_dead_zone: 20 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScaleConfig {
    pub initial: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self { initial: 2.0, min: 2.0, max: 12.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Follow the mouse pointer.
    #[default]
    Pointer,
    /// Read `<x> <y>` / `blink` lines from stdin.
    Stdin,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    pub source: SourceKind,
    pub poll_ms: u64,
    pub blink_trigger_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { source: SourceKind::Pointer, poll_ms: 30, blink_trigger_ms: 1500 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    pub tick_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self { tick_ms: 30 }
    }
}

impl Config {
    /// Defaults when `path` is `None`, otherwise the parsed file.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .map_err(|source| Error::ConfigFile { path: path.to_path_buf(), source })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, Error> {
        Ok(toml::from_str(text)?)
    }

    /// Checks that need no knowledge of the monitor.
    pub fn validate(&self) -> Result<(), Error> {
        let fail = |msg: String| Err(Error::Config(msg));

        if self.output_size().is_empty() {
            return fail(format!("window size {}x{} has a zero dimension", self.window.width, self.window.height));
        }
        if !(1..=64).contains(&self.smoothing.history_size) {
            return fail(format!("smoothing.history_size must be in 1..=64, got {}", self.smoothing.history_size));
        }
        if self.smoothing.max_speed == 0 {
            return fail("smoothing.max_speed must be positive".into());
        }
        if !(self.dwell.radius.is_finite() && self.dwell.radius > 0.0) {
            return fail(format!("dwell.radius must be positive, got {}", self.dwell.radius));
        }
        let ScaleConfig { initial, min, max } = self.scale;
        if !(min.is_finite() && max.is_finite() && min > 0.0) {
            return fail(format!("scale bounds must be positive and finite, got [{min}, {max}]"));
        }
        if min > max {
            return fail(format!("scale.min {min} is greater than scale.max {max}"));
        }
        if !(min..=max).contains(&initial) {
            return fail(format!("scale.initial {initial} is outside [{min}, {max}]"));
        }
        if self.timing.tick_ms == 0 || self.input.poll_ms == 0 {
            return fail("timing.tick_ms and input.poll_ms must be positive".into());
        }
        if self.input.blink_trigger_ms == 0 {
            return fail("input.blink_trigger_ms must be positive".into());
        }
        Ok(())
    }

    /// Checks against the monitor being magnified; call once it is known.
    pub fn validate_against(&self, monitor: Bounds) -> Result<(), Error> {
        self.validate()?;
        let out = self.output_size();
        if out.width > monitor.width || out.height > monitor.height {
            return Err(Error::Config(format!(
                "window {}x{} does not fit monitor {}x{}",
                out.width, out.height, monitor.width, monitor.height
            )));
        }
        // the smallest zoom must still yield a source region inside the monitor
        if f64::from(out.width) / self.scale.min > f64::from(monitor.width)
            || f64::from(out.height) / self.scale.min > f64::from(monitor.height)
        {
            return Err(Error::Config(format!(
                "scale.min {} makes the captured region larger than the monitor",
                self.scale.min
            )));
        }
        Ok(())
    }

    pub fn output_size(&self) -> Size {
        Size::new(self.window.width, self.window.height)
    }

    pub fn smoothing_params(&self) -> SmoothingParams {
        SmoothingParams {
            history_size: self.smoothing.history_size,
            dead_zone: self.smoothing.dead_zone,
            max_speed: self.smoothing.max_speed,
        }
    }

    pub fn dwell_config(&self) -> DwellConfig {
        DwellConfig { radius: self.dwell.radius, hold: Duration::from_millis(self.dwell.hold_ms) }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.timing.tick_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.input.poll_ms)
    }

    pub fn blink_trigger(&self) -> Duration {
        Duration::from_millis(self.input.blink_trigger_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const FULL_HD: Bounds = Bounds::new(0, 0, 1920, 1080);

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        cfg.validate_against(FULL_HD).unwrap();
        assert_eq!(cfg.output_size(), Size::new(800, 600));
        assert_eq!(cfg.dwell_config().hold, Duration::from_millis(500));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg = Config::parse(
            r#"
            [dwell]
            enabled = true
            hold_ms = 0

            [input]
            source = "stdin"
            "#,
        )
        .unwrap();
        assert!(cfg.dwell.enabled);
        assert_eq!(cfg.dwell.hold_ms, 0);
        assert_eq!(cfg.dwell.radius, 100.0);
        assert_eq!(cfg.input.source, SourceKind::Stdin);
        assert_eq!(cfg.smoothing, SmoothingConfig::default());
        cfg.validate().unwrap();
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(Config::parse("[window]\nopacity = 0.8\n"), Err(Error::ConfigParse(_))));
    }

    #[test]
    fn degenerate_settings_are_rejected() {
        let cases: [fn(&mut Config); 13] = [
            |c| c.window.width = 0,
            |c| c.smoothing.history_size = 0,
            |c| c.smoothing.history_size = 65,
            |c| c.smoothing.history_size = usize::MAX,
            |c| c.smoothing.max_speed = 0,
            |c| c.dwell.radius = 0.0,
            |c| c.dwell.radius = -5.0,
            |c| c.dwell.radius = f64::NAN,
            |c| c.scale.min = 0.0,
            |c| {
                c.scale.min = 8.0;
                c.scale.max = 4.0;
            },
            |c| c.scale.initial = 20.0,
            |c| c.timing.tick_ms = 0,
            |c| c.input.blink_trigger_ms = 0,
        ];
        for (i, mutate) in cases.into_iter().enumerate() {
            let mut cfg = Config::default();
            mutate(&mut cfg);
            assert!(matches!(cfg.validate(), Err(Error::Config(_))), "case {i} accepted: {cfg:?}");
        }
    }

    #[test]
    fn oversized_history_in_file_is_rejected() {
        let cfg = Config::parse("[smoothing]\nhistory_size = 1000000000000\n").unwrap();
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));

        let cfg = Config::parse("[smoothing]\nhistory_size = 64\n").unwrap();
        cfg.validate().unwrap();
    }

    #[test]
    fn output_must_fit_monitor() {
        let mut cfg = Config::default();
        cfg.window.width = 2000;
        assert!(matches!(cfg.validate_against(FULL_HD), Err(Error::Config(_))));

        let mut cfg = Config::default();
        cfg.scale.min = 0.5;
        cfg.scale.initial = 0.5;
        assert!(matches!(cfg.validate_against(FULL_HD), Err(Error::Config(_))));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[scale]\ninitial = 4.0").unwrap();
        let cfg = Config::load(Some(file.path())).unwrap();
        assert_eq!(cfg.scale.initial, 4.0);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = Config::load(Some(Path::new("/nonexistent/magnifier.toml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/magnifier.toml"));
    }
}
