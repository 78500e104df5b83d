//! `ge-state` translates the PSP graphics engine's fixed-function draw state onto wgpu.
//!
//! Per draw call the GE register snapshot ([`HardwareDrawState`]) is resolved into a
//! [`DrawStatePlan`]: blend, raster, depth/stencil and viewport/scissor state the host can
//! express. Where the host has no exact equivalent (doubled blend factors, two fixed blend colors,
//! stencil written through alpha, logic ops) the plan picks the closest host state and records
//! the [`Approximation`]. Blends that can't be approximated are finished in the fragment shader
//! against a budgeted framebuffer copy (see [`fallback`]).
//!
//! [`DrawStateEngine`] owns everything that persists across draws and talks to the host through
//! the traits in [`host`].

pub mod config;
pub mod diag;
pub mod engine;
pub mod fallback;
pub mod host;
pub mod regs;
pub mod state;
pub mod stats;

pub use config::{ConfigError, HostCaps, RenderingMode, StateConfig};
pub use diag::{Approximation, Diagnostics};
pub use engine::{resolve_draw_state, DrawStateEngine, DrawStatePlan, ShaderBlend};
pub use fallback::{ShaderBlendError, ShaderBlendFallback};
pub use host::{
    BlendUniforms, DirtyUniforms, DrawHost, FramebufferManager, RenderStateSink, ShaderManager,
    TextureCache,
};
pub use regs::{GePrimitive, GeRegisterFile, HardwareDrawState};
pub use stats::{DrawStateStats, DrawStateStatsSnapshot};
