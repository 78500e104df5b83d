//! Full blend resolution for one draw: color and alpha components plus the blend constant.

use crate::config::HostCaps;
use crate::diag::Approximation;
use crate::regs::{GeBufferFormat, GeDstBlend, GeLogicOp, GeSrcBlend, HardwareDrawState};

use super::blend_color::{reconcile_fixed_colors, BlendSide};
use super::logic_op::{emulate_logic_op, stencil_replace_blend};
use super::replace_blend::{classify_replace_blend, ReplaceBlend};
use super::stencil::{
    alpha_channel_blend, replace_alpha_with_stencil, stencil_constant_alpha, stencil_write_mode,
    ReplaceAlpha, StencilConstantAlpha, StencilWriteMode,
};
use super::tables::{
    to_dual_source, translate_blend_equation, translate_dst_blend, translate_src_blend,
};

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedBlendPlan {
    pub enabled: bool,
    pub color: wgpu::BlendComponent,
    pub alpha: wgpu::BlendComponent,
    /// RGBA blend constant, when any factor reads it.
    pub constant: Option<[f32; 4]>,
    pub replace_blend: ReplaceBlend,
    pub replace_alpha: ReplaceAlpha,
    pub stencil_write: StencilWriteMode,
    /// Logic-op emulation needs the shader to invert its color output.
    pub logic_shader_inverts: bool,
    /// The shader blends against a framebuffer copy bound in the late stage.
    pub needs_framebuffer_copy: bool,
    /// Shader-side blend uniforms (fixed colors, copy binding) have to be refreshed.
    pub dirty_shader_blend: bool,
    pub approximations: Vec<Approximation>,
}

impl ResolvedBlendPlan {
    pub fn approximate(&self) -> bool {
        !self.approximations.is_empty()
    }

    /// Host blend state, or `None` when blending is off.
    pub fn blend_state(&self) -> Option<wgpu::BlendState> {
        self.enabled.then_some(wgpu::BlendState {
            color: self.color,
            alpha: self.alpha,
        })
    }

    /// Value for `RenderPass::set_blend_constant`.
    pub fn constant_color(&self) -> Option<wgpu::Color> {
        self.constant.map(|[r, g, b, a]| wgpu::Color {
            r: f64::from(r),
            g: f64::from(g),
            b: f64::from(b),
            a: f64::from(a),
        })
    }
}

/// Classify the draw, noting when a framebuffer copy would have been used had it been allowed.
pub fn resolve_replace_blend(
    state: &HardwareDrawState,
    caps: HostCaps,
    allow_shader_blend: bool,
) -> (ReplaceBlend, Option<Approximation>) {
    let replace = classify_replace_blend(state, caps, allow_shader_blend);
    if !allow_shader_blend && classify_replace_blend(state, caps, true) == ReplaceBlend::CopyFbo {
        return (
            replace,
            Some(Approximation::ShaderBlendUnavailable { replace }),
        );
    }
    (replace, None)
}

/// With no alpha channel, destination alpha reads as zero.
fn fold_565(factor: wgpu::BlendFactor) -> wgpu::BlendFactor {
    match factor {
        wgpu::BlendFactor::DstAlpha => wgpu::BlendFactor::Zero,
        wgpu::BlendFactor::OneMinusDstAlpha => wgpu::BlendFactor::One,
        other => other,
    }
}

/// Min and max ignore the factors; the host requires them to be one.
fn normalize_minmax(mut component: wgpu::BlendComponent) -> wgpu::BlendComponent {
    if matches!(
        component.operation,
        wgpu::BlendOperation::Min | wgpu::BlendOperation::Max
    ) {
        component.src_factor = wgpu::BlendFactor::One;
        component.dst_factor = wgpu::BlendFactor::One;
    }
    component
}

fn reads_constant(component: &wgpu::BlendComponent) -> bool {
    let is_constant = |f| {
        matches!(
            f,
            wgpu::BlendFactor::Constant | wgpu::BlendFactor::OneMinusConstant
        )
    };
    is_constant(component.src_factor) || is_constant(component.dst_factor)
}

/// Resolve the blend for `replace_blend`, which the caller has already settled with the
/// shader-blend fallback. `framebuffer_copy` is whether a copy was granted for `CopyFbo`.
pub fn resolve_blend(
    state: &HardwareDrawState,
    caps: HostCaps,
    replace_blend: ReplaceBlend,
    framebuffer_copy: bool,
) -> ResolvedBlendPlan {
    let stencil_write = stencil_write_mode(state);
    let (replace_alpha, alpha_note) = replace_alpha_with_stencil(state, replace_blend, caps);
    let mut approximations: Vec<Approximation> = alpha_note.into_iter().collect();

    let shader_blends = replace_blend == ReplaceBlend::CopyFbo && framebuffer_copy;
    if replace_blend == ReplaceBlend::No || shader_blends {
        // Nothing for the fixed-function color blend to do; it may still carry the stencil
        // update or a logic op.
        let emulate = state.logic_op_enable
            && !state.clear_mode
            && !caps.contains(HostCaps::LOGIC_OP);
        let emulation = emulate.then(|| emulate_logic_op(state.logic_op));
        if let Some(note) = emulation.and_then(|e| e.approximation) {
            approximations.push(note);
        }
        // Only a shader that outputs the stencil value can accumulate into alpha.
        let alpha_mode = if replace_alpha == ReplaceAlpha::Yes {
            stencil_write
        } else {
            StencilWriteMode::Keep
        };
        let blend = stencil_replace_blend(emulation.as_ref(), alpha_mode);
        return ResolvedBlendPlan {
            enabled: blend.enabled,
            color: blend.color,
            alpha: blend.alpha,
            constant: None,
            replace_blend,
            replace_alpha,
            stencil_write,
            logic_shader_inverts: emulation.is_some_and(|e| e.shader_inverts),
            needs_framebuffer_copy: shader_blends,
            dirty_shader_blend: shader_blends,
            approximations,
        };
    }

    let src_sel = state.blend_src;
    let dst_sel = state.blend_dst;
    let pre_src = replace_blend.uses_pre_src() && src_sel == GeSrcBlend::FixA;

    let mut src = if pre_src {
        // The shader already multiplied by FIXA.
        BlendSide::table(wgpu::BlendFactor::One)
    } else if src_sel == GeSrcBlend::FixA {
        BlendSide::fixed(state.fix_a)
    } else {
        BlendSide::table(translate_src_blend(src_sel))
    };
    let mut dst = if dst_sel == GeDstBlend::FixB {
        BlendSide::fixed(state.fix_b)
    } else {
        BlendSide::table(translate_dst_blend(dst_sel))
    };

    if state.framebuffer_format == GeBufferFormat::Rgb565 {
        src.factor = src.factor.map(fold_565);
        dst.factor = dst.factor.map(fold_565);
    }

    let (mut src_factor, mut dst_factor, constant_rgb) = if src.is_fixed || dst.is_fixed {
        let plan = reconcile_fixed_colors(src, dst, src_sel, dst_sel, pre_src);
        approximations.extend(plan.approximations);
        (plan.src, plan.dst, plan.constant_rgb)
    } else {
        (
            src.factor.unwrap_or(wgpu::BlendFactor::One),
            dst.factor.unwrap_or(wgpu::BlendFactor::Zero),
            None,
        )
    };

    if replace_alpha == ReplaceAlpha::DualSource {
        src_factor = to_dual_source(src_factor);
        dst_factor = to_dual_source(dst_factor);
    }

    let color = normalize_minmax(wgpu::BlendComponent {
        src_factor,
        dst_factor,
        operation: translate_blend_equation(
            state.blend_eq,
            caps.contains(HostCaps::BLEND_MINMAX),
        ),
    });

    let constant_alpha = if state.stencil_test_enable && replace_alpha == ReplaceAlpha::No {
        stencil_constant_alpha(stencil_write, state.stencil_ref)
    } else {
        StencilConstantAlpha::ONE
    };
    let alpha_blend = alpha_channel_blend(
        replace_alpha,
        stencil_write,
        state.stencil_test_enable,
        constant_alpha,
    );
    approximations.extend(alpha_blend.approximation);
    let alpha = alpha_blend.component;

    // The color blend is taken, so a logic op can't be emulated through it.
    if state.logic_op_enable
        && state.logic_op != GeLogicOp::Copy
        && !caps.contains(HostCaps::LOGIC_OP)
    {
        approximations.push(Approximation::LogicOpUnsupported {
            op: state.logic_op,
        });
    }

    let constant = match constant_rgb {
        Some([r, g, b]) => Some([r, g, b, constant_alpha.value]),
        None if reads_constant(&alpha) => Some([1.0, 1.0, 1.0, constant_alpha.value]),
        None => None,
    };

    ResolvedBlendPlan {
        enabled: true,
        color,
        alpha,
        constant,
        replace_blend,
        replace_alpha,
        stencil_write,
        logic_shader_inverts: false,
        needs_framebuffer_copy: false,
        dirty_shader_blend: pre_src,
        approximations,
    }
}
