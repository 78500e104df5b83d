use bitflags::bitflags;
use thiserror::Error;

pub const ALWAYS_DEPTH_WRITE_ENV: &str = "GE_ALWAYS_DEPTH_WRITE";
pub const DISABLE_STENCIL_TEST_ENV: &str = "GE_DISABLE_STENCIL_TEST";
pub const DISABLE_SLOW_FRAMEBUFFER_EFFECTS_ENV: &str = "GE_DISABLE_SLOW_FRAMEBUFFER_EFFECTS";
pub const RENDERING_MODE_ENV: &str = "GE_RENDERING_MODE";
pub const STEREO_RENDERING_ENV: &str = "GE_STEREO_RENDERING";

bitflags! {
    /// Host graphics capabilities the translator may lean on. Queried, never mutated.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct HostCaps: u32 {
        const DUAL_SOURCE_BLEND = 1 << 0;
        const LOGIC_OP = 1 << 1;
        const BLEND_MINMAX = 1 << 2;
        const FRAMEBUFFER_FETCH = 1 << 3;
    }
}

impl HostCaps {
    /// Capabilities of a wgpu device created with `features`.
    ///
    /// Min/max blend operations are core WebGPU; logic ops and framebuffer fetch are not exposed.
    pub fn from_wgpu_features(features: wgpu::Features) -> Self {
        let mut caps = HostCaps::BLEND_MINMAX;
        if features.contains(wgpu::Features::DUAL_SOURCE_BLENDING) {
            caps |= HostCaps::DUAL_SOURCE_BLEND;
        }
        caps
    }
}

/// Where the emulated framebuffer lands on the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderingMode {
    /// Render into intermediate buffers; coordinates are top-left origin.
    #[default]
    Buffered,
    /// Render straight to the display surface, whose Y axis is flipped.
    Direct,
}

impl RenderingMode {
    pub fn is_buffered(self) -> bool {
        self == RenderingMode::Buffered
    }
}

/// Global toggles that affect translation. Immutable for the duration of a draw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StateConfig {
    pub always_depth_write: bool,
    pub disable_stencil_test: bool,
    pub disable_slow_framebuffer_effects: bool,
    pub rendering_mode: RenderingMode,
    pub stereo_rendering: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has unrecognized value {value:?} (expected \"buffered\" or \"direct\")")]
    InvalidRenderingMode { name: &'static str, value: String },
}

fn env_var_truthy(name: &str) -> bool {
    let Ok(raw) = std::env::var(name) else {
        return false;
    };
    is_truthy(&raw)
}

fn is_truthy(raw: &str) -> bool {
    let v = raw.trim();
    v == "1"
        || v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
}

fn parse_rendering_mode(raw: &str) -> Result<RenderingMode, ConfigError> {
    let v = raw.trim();
    if v.eq_ignore_ascii_case("buffered") {
        Ok(RenderingMode::Buffered)
    } else if v.eq_ignore_ascii_case("direct") || v.eq_ignore_ascii_case("non-buffered") {
        Ok(RenderingMode::Direct)
    } else {
        Err(ConfigError::InvalidRenderingMode {
            name: RENDERING_MODE_ENV,
            value: raw.to_owned(),
        })
    }
}

impl StateConfig {
    /// Build a config from `GE_*` environment overrides, defaulting everything that is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let rendering_mode = match std::env::var(RENDERING_MODE_ENV) {
            Ok(raw) => parse_rendering_mode(&raw)?,
            Err(_) => RenderingMode::default(),
        };
        Ok(Self {
            always_depth_write: env_var_truthy(ALWAYS_DEPTH_WRITE_ENV),
            disable_stencil_test: env_var_truthy(DISABLE_STENCIL_TEST_ENV),
            disable_slow_framebuffer_effects: env_var_truthy(DISABLE_SLOW_FRAMEBUFFER_EFFECTS_ENV),
            rendering_mode,
            stereo_rendering: env_var_truthy(STEREO_RENDERING_ENV),
        })
    }

    pub fn use_buffered_rendering(&self) -> bool {
        self.rendering_mode.is_buffered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_values_match_env_convention() {
        for v in ["1", "true", "YES", " on "] {
            assert!(is_truthy(v), "{v:?} should be truthy");
        }
        for v in ["0", "false", "", "2"] {
            assert!(!is_truthy(v), "{v:?} should not be truthy");
        }
    }

    #[test]
    fn rendering_mode_parses_known_names() {
        assert_eq!(parse_rendering_mode("Buffered"), Ok(RenderingMode::Buffered));
        assert_eq!(parse_rendering_mode("direct"), Ok(RenderingMode::Direct));
        assert_eq!(
            parse_rendering_mode("non-buffered"),
            Ok(RenderingMode::Direct)
        );
        assert!(matches!(
            parse_rendering_mode("sideways"),
            Err(ConfigError::InvalidRenderingMode { .. })
        ));
    }

    #[test]
    fn wgpu_caps_track_dual_source_feature() {
        let caps = HostCaps::from_wgpu_features(wgpu::Features::empty());
        assert_eq!(caps, HostCaps::BLEND_MINMAX);

        let caps = HostCaps::from_wgpu_features(wgpu::Features::DUAL_SOURCE_BLENDING);
        assert!(caps.contains(HostCaps::DUAL_SOURCE_BLEND));
        assert!(!caps.contains(HostCaps::LOGIC_OP));
    }
}
