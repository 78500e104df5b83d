//! Stencil write-back through the alpha channel.
//!
//! The GE stores the stencil value in the framebuffer's alpha bits, so every stencil update is an
//! alpha write. The host stencil buffer only covers the test; what ends up in alpha has to be
//! produced by the fragment shader and/or the alpha half of the blend state.

use crate::config::HostCaps;
use crate::diag::Approximation;
use crate::regs::{GeBufferFormat, GeStencilOp, HardwareDrawState};

use super::replace_blend::ReplaceBlend;

/// Granularity of one stencil increment as seen through the alpha channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StencilStep {
    Four,
    Eight,
}

impl StencilStep {
    /// One stencil unit in normalized alpha.
    pub fn delta(self) -> f32 {
        match self {
            StencilStep::Four => 1.0 / 15.0,
            StencilStep::Eight => 1.0 / 255.0,
        }
    }
}

/// What a passing fragment writes to the stencil bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StencilWriteMode {
    /// Leave alpha untouched.
    Keep,
    Zero,
    One,
    /// The test reference value, supplied as a uniform.
    Uniform,
    Increment(StencilStep),
    Decrement(StencilStep),
    Invert,
}

impl StencilWriteMode {
    pub fn writes_alpha(self) -> bool {
        self != StencilWriteMode::Keep
    }
}

pub fn stencil_write_mode(state: &HardwareDrawState) -> StencilWriteMode {
    if !state.stencil_test_enable {
        return StencilWriteMode::Keep;
    }

    let step = match state.framebuffer_format {
        // No alpha bits to preserve, so even KEEP writes One. The color mask still asks for
        // alpha; the host target simply has nothing to store it in.
        GeBufferFormat::Rgb565 => return StencilWriteMode::One,
        GeBufferFormat::Rgba5551 | GeBufferFormat::Rgba4444 => StencilStep::Four,
        GeBufferFormat::Rgba8888 => StencilStep::Eight,
    };

    match state.stencil_zpass {
        GeStencilOp::Keep | GeStencilOp::Reserved6 | GeStencilOp::Reserved7 => {
            StencilWriteMode::Keep
        }
        GeStencilOp::Zero => StencilWriteMode::Zero,
        GeStencilOp::Replace => StencilWriteMode::Uniform,
        GeStencilOp::Invert => StencilWriteMode::Invert,
        GeStencilOp::Increment => StencilWriteMode::Increment(step),
        GeStencilOp::Decrement => StencilWriteMode::Decrement(step),
    }
}

/// Whether the fragment shader outputs the stencil value as its alpha.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReplaceAlpha {
    No,
    Yes,
    /// Alpha carries the stencil value; the blend reads real alpha from the second output.
    DualSource,
}

/// Decide whether the shader can take over alpha for the stencil value.
///
/// Fails over to `No` (and reports it) when the blend factors read source alpha and the host
/// has no dual-source blending to keep the two apart.
pub fn replace_alpha_with_stencil(
    state: &HardwareDrawState,
    replace_blend: ReplaceBlend,
    caps: HostCaps,
) -> (ReplaceAlpha, Option<Approximation>) {
    if !state.stencil_test_enable || state.clear_mode {
        return (ReplaceAlpha::No, None);
    }

    match replace_blend {
        ReplaceBlend::No | ReplaceBlend::CopyFbo => (ReplaceAlpha::Yes, None),
        _ if state.blend_src.ignores_src_alpha() && state.blend_dst.ignores_src_alpha() => {
            (ReplaceAlpha::Yes, None)
        }
        _ if caps.contains(HostCaps::DUAL_SOURCE_BLEND) => (ReplaceAlpha::DualSource, None),
        _ => (
            ReplaceAlpha::No,
            Some(Approximation::StencilAlphaWithoutDualSource),
        ),
    }
}

/// Constant alpha used to nudge stencil values through the blend when the shader can't.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StencilConstantAlpha {
    pub value: f32,
    pub factor: wgpu::BlendFactor,
}

impl StencilConstantAlpha {
    pub const ONE: StencilConstantAlpha = StencilConstantAlpha {
        value: 1.0,
        factor: wgpu::BlendFactor::One,
    };

    /// Whether the value has to occupy the blend constant's alpha.
    pub fn needs_constant(&self) -> bool {
        self.factor == wgpu::BlendFactor::Constant
    }
}

pub fn stencil_constant_alpha(mode: StencilWriteMode, stencil_ref: u8) -> StencilConstantAlpha {
    let value = match mode {
        StencilWriteMode::Uniform => f32::from(stencil_ref) / 255.0,
        StencilWriteMode::Increment(step) | StencilWriteMode::Decrement(step) => step.delta(),
        StencilWriteMode::Keep
        | StencilWriteMode::Zero
        | StencilWriteMode::One
        | StencilWriteMode::Invert => 1.0,
    };
    let factor = if value <= 0.0 {
        wgpu::BlendFactor::Zero
    } else if value < 1.0 {
        wgpu::BlendFactor::Constant
    } else {
        wgpu::BlendFactor::One
    };
    StencilConstantAlpha { value, factor }
}

/// Alpha half of a blended draw.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AlphaChannelBlend {
    pub component: wgpu::BlendComponent,
    pub approximation: Option<Approximation>,
}

fn alpha(
    src_factor: wgpu::BlendFactor,
    dst_factor: wgpu::BlendFactor,
    operation: wgpu::BlendOperation,
) -> wgpu::BlendComponent {
    wgpu::BlendComponent {
        src_factor,
        dst_factor,
        operation,
    }
}

/// Alpha blend for draws that also blend color.
///
/// The GE never blends alpha; alpha is the stencil. When the shader outputs the stencil value
/// the alpha blend adds, subtracts or replaces with it. Otherwise the constant alpha is used as a
/// rough stand-in, which can only move the stored value in the right direction.
pub fn alpha_channel_blend(
    replace_alpha: ReplaceAlpha,
    mode: StencilWriteMode,
    stencil_enabled: bool,
    constant: StencilConstantAlpha,
) -> AlphaChannelBlend {
    use wgpu::BlendFactor::{One, Zero};
    use wgpu::BlendOperation::{Add, ReverseSubtract, Subtract};

    if replace_alpha != ReplaceAlpha::No {
        let component = match mode {
            StencilWriteMode::Increment(_) => alpha(One, One, Add),
            StencilWriteMode::Decrement(_) => alpha(One, One, Subtract),
            // The shader outputs one; reverse-subtracting flips the stored bits.
            StencilWriteMode::Invert => alpha(One, One, ReverseSubtract),
            _ => alpha(One, Zero, Add),
        };
        return AlphaChannelBlend {
            component,
            approximation: None,
        };
    }

    if !stencil_enabled {
        // Retain whatever alpha is already stored.
        return AlphaChannelBlend {
            component: alpha(Zero, One, Add),
            approximation: None,
        };
    }

    let (component, exact) = match mode {
        StencilWriteMode::Keep => (alpha(Zero, One, Add), true),
        StencilWriteMode::Zero => (alpha(Zero, Zero, Add), true),
        StencilWriteMode::One => (alpha(One, One, Add), false),
        // Multiplies with the source alpha rather than replacing; better than random values.
        StencilWriteMode::Uniform => (alpha(constant.factor, Zero, Add), false),
        StencilWriteMode::Increment(_) => (alpha(constant.factor, One, Add), false),
        StencilWriteMode::Decrement(_) => (alpha(constant.factor, One, Subtract), false),
        // Only inverts when the output alpha is close to one.
        StencilWriteMode::Invert => (alpha(One, One, ReverseSubtract), false),
    };
    AlphaChannelBlend {
        component,
        approximation: (!exact).then_some(Approximation::StencilAlphaViaBlend { mode }),
    }
}
