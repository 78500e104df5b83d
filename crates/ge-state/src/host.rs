//! Narrow interfaces to the collaborators that own host resources.
//!
//! The engine never touches textures, framebuffers or pipelines itself. It tells these traits
//! what changed, in a fixed order, once per draw.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

use crate::regs::HardwareDrawState;
use crate::state::blend_color::fixed_color_rgb;
use crate::state::{
    DepthStencilPlan, ProjectionAdjust, RasterPlan, RenderTargetInfo, ResolvedBlendPlan,
    ViewportScissorPlan,
};

bitflags! {
    /// Uniform groups the shader manager must re-upload before the draw.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct DirtyUniforms: u32 {
        const SHADER_BLEND = 1 << 0;
        const TEX_CLAMP = 1 << 1;
        const PROJ_MATRIX = 1 << 2;
    }
}

pub trait FramebufferManager {
    fn target_info(&self) -> RenderTargetInfo;
    /// Display flip counter; changes once per presented frame.
    fn flip_count(&self) -> u64;
    /// The draw writes depth, so the depth buffer contents must be preserved.
    fn set_depth_updated(&mut self);
    /// Bind the current framebuffer color as a texture, copying it if the host can't sample the
    /// render target directly.
    fn bind_framebuffer_color(&mut self);
    fn unbind_framebuffer_color(&mut self);
}

pub trait TextureCache {
    /// Texture registers changed since the last bind.
    fn texture_changed(&self) -> bool;
    /// Bind the current texture. Returns whether the shader must clamp coordinates itself.
    fn set_texture(&mut self) -> bool;
    /// Apply sampler parameters for the bound texture.
    fn apply_texture(&mut self);
    /// Bind the lookup texture used by the alpha and color tests.
    fn bind_test_texture(&mut self);
}

pub trait ShaderManager {
    fn dirty_uniforms(&mut self, dirty: DirtyUniforms);
    fn upload_blend_uniforms(&mut self, uniforms: &BlendUniforms);
}

/// Receives host state changes. Calls arrive only when the value differs from the previous one.
pub trait RenderStateSink {
    fn set_blend(&mut self, blend: &ResolvedBlendPlan);
    fn set_raster(&mut self, raster: &RasterPlan);
    fn set_depth_stencil(&mut self, depth_stencil: &DepthStencilPlan);
    fn set_viewport_scissor(&mut self, viewport: &ViewportScissorPlan);
}

/// Everything a draw needs from the host.
pub trait DrawHost: FramebufferManager + TextureCache + ShaderManager + RenderStateSink {}

impl<T> DrawHost for T where T: FramebufferManager + TextureCache + ShaderManager + RenderStateSink {}

/// Shader-side blend inputs, laid out for a uniform buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct BlendUniforms {
    /// Fixed colors as RGB plus one padding lane.
    pub fix_a: [f32; 4],
    pub fix_b: [f32; 4],
    /// Stencil reference as alpha, written by the shader when it replaces alpha.
    pub stencil_replace: f32,
    /// [`ReplaceBlend`](crate::state::ReplaceBlend) discriminant.
    pub replace_blend: u32,
    /// Non-zero when the shader must invert its color for logic-op emulation.
    pub logic_invert: u32,
    pub _pad: u32,
}

impl BlendUniforms {
    pub fn new(state: &HardwareDrawState, blend: &ResolvedBlendPlan) -> Self {
        let [ar, ag, ab] = fixed_color_rgb(state.fix_a);
        let [br, bg, bb] = fixed_color_rgb(state.fix_b);
        Self {
            fix_a: [ar, ag, ab, 0.0],
            fix_b: [br, bg, bb, 0.0],
            stencil_replace: f32::from(state.stencil_ref) / 255.0,
            replace_blend: blend.replace_blend as u32,
            logic_invert: u32::from(blend.logic_shader_inverts),
            _pad: 0,
        }
    }
}

/// Last value handed to the host for one piece of state.
#[derive(Debug)]
pub struct Cached<T> {
    last: Option<T>,
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Self { last: None }
    }
}

impl<T: Clone + PartialEq> Cached<T> {
    /// Remember `value`, returning whether it differs from what was last seen.
    pub fn update(&mut self, value: &T) -> bool {
        if self.last.as_ref() == Some(value) {
            return false;
        }
        self.last = Some(value.clone());
        true
    }

    pub fn get(&self) -> Option<&T> {
        self.last.as_ref()
    }

    pub fn invalidate(&mut self) {
        self.last = None;
    }
}

/// Redundant-call filter in front of [`RenderStateSink`]. Never alters a plan.
#[derive(Debug, Default)]
pub struct HostStateCache {
    pub blend: Cached<ResolvedBlendPlan>,
    pub raster: Cached<RasterPlan>,
    pub depth_stencil: Cached<DepthStencilPlan>,
    pub viewport: Cached<ViewportScissorPlan>,
    pub projection: Cached<ProjectionAdjust>,
}

impl HostStateCache {
    pub fn invalidate(&mut self) {
        self.blend.invalidate();
        self.raster.invalidate();
        self.depth_stencil.invalidate();
        self.viewport.invalidate();
        self.projection.invalidate();
    }
}
