//! Per-draw orchestration: resolve the plans, then push what changed to the host.

use tracing::debug;

use crate::config::{HostCaps, StateConfig};
use crate::diag::{Approximation, Diagnostics};
use crate::fallback::ShaderBlendFallback;
use crate::host::{
    BlendUniforms, DirtyUniforms, DrawHost, FramebufferManager, HostStateCache, TextureCache,
};
use crate::regs::{GePrimitive, HardwareDrawState};
use crate::state::{
    classify_replace_blend, plan_depth_stencil, plan_raster, plan_viewport_scissor,
    resolve_blend, resolve_replace_blend, translate_primitive_topology, DepthStencilPlan,
    PrimitiveTopologyTranslation, RasterPlan, RenderTargetInfo, ReplaceBlend, ResolvedBlendPlan,
    ViewportScissorPlan,
};
use crate::stats::DrawStateStats;

/// Whether the blend may be finished in the shader against a framebuffer copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderBlend {
    /// Allowed, and a copy is available if the blend needs one.
    Allowed,
    /// Disabled by configuration, suspended, or refused for this draw.
    Unavailable,
}

/// Everything the host needs for one draw.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawStatePlan {
    pub blend: ResolvedBlendPlan,
    pub raster: RasterPlan,
    pub depth_stencil: DepthStencilPlan,
    pub viewport: ViewportScissorPlan,
    pub topology: PrimitiveTopologyTranslation,
}

impl DrawStatePlan {
    pub fn approximations(&self) -> impl Iterator<Item = &Approximation> {
        self.blend
            .approximations
            .iter()
            .chain(&self.raster.approximations)
            .chain(&self.depth_stencil.approximations)
    }

    pub fn is_approximate(&self) -> bool {
        self.approximations().next().is_some()
    }
}

/// Resolve a draw without side effects. Same inputs, same plan.
pub fn resolve_draw_state(
    prim: GePrimitive,
    state: &HardwareDrawState,
    config: &StateConfig,
    caps: HostCaps,
    target: &RenderTargetInfo,
    shader_blend: ShaderBlend,
) -> DrawStatePlan {
    let allowed = shader_blend == ShaderBlend::Allowed;
    let (replace_blend, note) = resolve_replace_blend(state, caps, allowed);
    let mut blend = resolve_blend(state, caps, replace_blend, allowed);
    blend.approximations.extend(note);

    DrawStatePlan {
        raster: plan_raster(prim, state, config, caps, blend.stencil_write),
        depth_stencil: plan_depth_stencil(state, config),
        viewport: plan_viewport_scissor(state, target, config),
        topology: translate_primitive_topology(prim),
        blend,
    }
}

/// Owns the cross-draw state: fallback budget, once-only diagnostics and the redundant-call cache.
#[derive(Debug)]
pub struct DrawStateEngine {
    config: StateConfig,
    caps: HostCaps,
    fallback: ShaderBlendFallback,
    diagnostics: Diagnostics,
    cache: HostStateCache,
    stats: DrawStateStats,
    /// Flip during which shader blending ran out of copies.
    suspended_at_flip: Option<u64>,
}

impl DrawStateEngine {
    pub fn new(config: StateConfig, caps: HostCaps) -> Self {
        Self {
            config,
            caps,
            fallback: ShaderBlendFallback::new(),
            diagnostics: Diagnostics::new(),
            cache: HostStateCache::default(),
            stats: DrawStateStats::new(),
            suspended_at_flip: None,
        }
    }

    pub fn config(&self) -> &StateConfig {
        &self.config
    }

    pub fn caps(&self) -> HostCaps {
        self.caps
    }

    pub fn stats(&self) -> &DrawStateStats {
        &self.stats
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn fallback(&self) -> &ShaderBlendFallback {
        &self.fallback
    }

    pub fn shader_blend_suspended(&self) -> bool {
        self.suspended_at_flip.is_some()
    }

    /// Translate and apply the state for one draw.
    pub fn apply_draw_state<H: DrawHost>(
        &mut self,
        prim: GePrimitive,
        state: &HardwareDrawState,
        host: &mut H,
    ) -> DrawStatePlan {
        self.stats.inc_draws();
        let mut dirty = DirtyUniforms::empty();

        if !state.clear_mode
            && state.texture_map_enable
            && host.texture_changed()
            && host.set_texture()
        {
            dirty |= DirtyUniforms::TEX_CLAMP;
        }

        let flip = host.flip_count();
        if self.suspended_at_flip.is_some_and(|f| f != flip) {
            self.suspended_at_flip = None;
        }
        let shader_blend = self.settle_shader_blend(state, flip, host);

        let target = host.target_info();
        let plan = resolve_draw_state(prim, state, &self.config, self.caps, &target, shader_blend);

        if plan.is_approximate() {
            self.stats.inc_approximated_draws();
            self.diagnostics.report_all(plan.approximations());
        }

        if plan.blend.dirty_shader_blend {
            dirty |= DirtyUniforms::SHADER_BLEND;
            host.upload_blend_uniforms(&BlendUniforms::new(state, &plan.blend));
        }
        if plan.depth_stencil.writes_depth() {
            host.set_depth_updated();
        }
        if self.cache.projection.update(&plan.viewport.projection) {
            dirty |= DirtyUniforms::PROJ_MATRIX;
        }
        if !dirty.is_empty() {
            host.dirty_uniforms(dirty);
        }

        let issued = self.cache.blend.update(&plan.blend);
        if issued {
            host.set_blend(&plan.blend);
        }
        self.stats.record_state_call(issued);

        let issued = self.cache.raster.update(&plan.raster);
        if issued {
            host.set_raster(&plan.raster);
        }
        self.stats.record_state_call(issued);

        let issued = self.cache.depth_stencil.update(&plan.depth_stencil);
        if issued {
            host.set_depth_stencil(&plan.depth_stencil);
        }
        self.stats.record_state_call(issued);

        let issued = self.cache.viewport.update(&plan.viewport);
        if issued {
            host.set_viewport_scissor(&plan.viewport);
        }
        self.stats.record_state_call(issued);

        plan
    }

    /// Texture and framebuffer bindings that must follow shader selection.
    pub fn apply_late_state<H: FramebufferManager + TextureCache>(
        &mut self,
        state: &HardwareDrawState,
        host: &mut H,
    ) {
        if state.clear_mode {
            return;
        }
        if state.alpha_test_enable || state.color_test_enable {
            host.bind_test_texture();
        }
        host.apply_texture();
        if self.fallback.take_pending_bind() {
            host.bind_framebuffer_color();
        }
    }

    /// Start of a new emulated frame: restore the copy budget and shader blending.
    pub fn begin_frame<F: FramebufferManager>(&mut self, fb: &mut F) {
        if self.fallback.reset() {
            fb.unbind_framebuffer_color();
        }
        self.suspended_at_flip = None;
    }

    /// Full reset, e.g. after the host device was recreated.
    pub fn reset<F: FramebufferManager>(&mut self, fb: &mut F) {
        self.begin_frame(fb);
        self.invalidate_cache();
    }

    /// Forget what was last sent so the next draw re-issues everything.
    pub fn invalidate_cache(&mut self) {
        self.cache.invalidate();
    }

    fn settle_shader_blend<F: FramebufferManager>(
        &mut self,
        state: &HardwareDrawState,
        flip: u64,
        fb: &mut F,
    ) -> ShaderBlend {
        let allowed =
            !self.config.disable_slow_framebuffer_effects && self.suspended_at_flip.is_none();
        let replace = classify_replace_blend(state, self.caps, allowed);
        if replace != ReplaceBlend::CopyFbo {
            if self.fallback.release() {
                fb.unbind_framebuffer_color();
            }
            return if allowed {
                ShaderBlend::Allowed
            } else {
                ShaderBlend::Unavailable
            };
        }

        match self.fallback.request_copy(flip, self.caps) {
            Ok(()) => {
                if self.fallback.needs_bind() {
                    self.stats.inc_framebuffer_copies();
                }
                ShaderBlend::Allowed
            }
            Err(err) => {
                debug!(%err, flip, "suspending shader blending");
                self.stats.inc_framebuffer_copies_refused();
                self.suspended_at_flip = Some(flip);
                if self.fallback.release() {
                    fb.unbind_framebuffer_color();
                }
                ShaderBlend::Unavailable
            }
        }
    }
}
