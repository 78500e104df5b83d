//! Deciding how much of the GE blend the fragment shader has to take over.
//!
//! The GE has doubled alpha factors and an absolute-difference equation that no host blend
//! state expresses. Depending on the combination the shader can pre-scale its output, or the
//! blend has to be done entirely in the shader against a copy of the framebuffer.

use crate::config::HostCaps;
use crate::regs::{GeBlendMode, GeBufferFormat, GeDstBlend, GeSrcBlend, HardwareDrawState};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReplaceBlend {
    /// Blending is off (or clear mode).
    No,
    /// Fixed-function blend is close enough.
    Standard,
    /// The shader multiplies the source color by FIXA; the host source factor is ONE.
    PreSrc,
    /// Like `PreSrc`, and the shader also doubles alpha.
    PreSrc2xAlpha,
    /// The shader doubles its output alpha.
    TwoXAlpha,
    /// The shader doubles its output color.
    TwoXSrc,
    /// The shader blends against a copy of the framebuffer.
    CopyFbo,
}

impl ReplaceBlend {
    pub fn uses_pre_src(self) -> bool {
        matches!(self, ReplaceBlend::PreSrc | ReplaceBlend::PreSrc2xAlpha)
    }
}

/// `CopyFbo` when shader blending is allowed, else the fixed-function fallback.
fn copy_or(allow_shader_blend: bool, fallback: ReplaceBlend) -> ReplaceBlend {
    if allow_shader_blend {
        ReplaceBlend::CopyFbo
    } else {
        fallback
    }
}

/// Doubled destination alpha is meaningless without an alpha channel.
fn copy_unless_565(
    allow_shader_blend: bool,
    format: GeBufferFormat,
    fallback: ReplaceBlend,
) -> ReplaceBlend {
    if format == GeBufferFormat::Rgb565 {
        fallback
    } else {
        copy_or(allow_shader_blend, fallback)
    }
}

pub fn classify_replace_blend(
    state: &HardwareDrawState,
    caps: HostCaps,
    allow_shader_blend: bool,
) -> ReplaceBlend {
    if !state.alpha_blend_enable || state.clear_mode {
        return ReplaceBlend::No;
    }

    match state.blend_eq {
        GeBlendMode::AbsDiff => return copy_or(allow_shader_blend, ReplaceBlend::Standard),
        GeBlendMode::Min | GeBlendMode::Max => {
            if caps.contains(HostCaps::BLEND_MINMAX) {
                return ReplaceBlend::Standard;
            }
            return copy_or(allow_shader_blend, ReplaceBlend::Standard);
        }
        GeBlendMode::Add | GeBlendMode::Subtract | GeBlendMode::ReverseSubtract => {}
    }

    let format = state.framebuffer_format;
    let fetch = caps.contains(HostCaps::FRAMEBUFFER_FETCH);
    let src = state.blend_src;
    let dst = state.blend_dst;

    match src {
        GeSrcBlend::DoubleSrcAlpha | GeSrcBlend::DoubleInvSrcAlpha => match dst {
            // Doubling alpha alone would clamp; the source color has to stay exact.
            GeDstBlend::SrcColor | GeDstBlend::InvSrcColor => {
                copy_or(allow_shader_blend, ReplaceBlend::TwoXAlpha)
            }
            GeDstBlend::DoubleDstAlpha | GeDstBlend::DoubleInvDstAlpha => {
                copy_unless_565(allow_shader_blend, format, ReplaceBlend::TwoXAlpha)
            }
            GeDstBlend::DoubleSrcAlpha => {
                if fetch {
                    copy_or(allow_shader_blend, ReplaceBlend::PreSrc2xAlpha)
                } else {
                    // A copy is not accurate either when primitives overlap.
                    ReplaceBlend::PreSrc2xAlpha
                }
            }
            GeDstBlend::DoubleInvSrcAlpha => ReplaceBlend::PreSrc2xAlpha,
            GeDstBlend::SrcAlpha
            | GeDstBlend::InvSrcAlpha
            | GeDstBlend::DstAlpha
            | GeDstBlend::InvDstAlpha
            | GeDstBlend::FixB => ReplaceBlend::TwoXSrc,
        },

        GeSrcBlend::DoubleDstAlpha => match dst {
            GeDstBlend::DoubleSrcAlpha | GeDstBlend::DoubleInvSrcAlpha => {
                copy_unless_565(allow_shader_blend, format, ReplaceBlend::TwoXAlpha)
            }
            _ => copy_unless_565(allow_shader_blend, format, ReplaceBlend::Standard),
        },

        // Doubling the source color is the wrong direction here; only the framebuffer helps.
        GeSrcBlend::DoubleInvDstAlpha => {
            copy_unless_565(allow_shader_blend, format, ReplaceBlend::Standard)
        }

        GeSrcBlend::FixA => match dst {
            GeDstBlend::DoubleSrcAlpha => copy_or(allow_shader_blend, ReplaceBlend::TwoXAlpha),
            // Clamps to zero either way.
            GeDstBlend::DoubleInvSrcAlpha => ReplaceBlend::TwoXAlpha,
            GeDstBlend::DoubleDstAlpha | GeDstBlend::DoubleInvDstAlpha => {
                copy_unless_565(allow_shader_blend, format, ReplaceBlend::Standard)
            }
            GeDstBlend::FixB => {
                let fix_a = state.fix_a & 0x00FF_FFFF;
                let fix_b = state.fix_b & 0x00FF_FFFF;
                if fix_a == 0xFF_FFFF && fix_b == 0 {
                    // src * 1 + dst * 0: not blending at all.
                    ReplaceBlend::No
                } else if fix_a == 0xFF_FFFF || fix_a == 0 || fix_b == 0xFF_FFFF || fix_b == 0 {
                    ReplaceBlend::Standard
                } else {
                    ReplaceBlend::PreSrc
                }
            }
            _ => ReplaceBlend::Standard,
        },

        GeSrcBlend::DstColor
        | GeSrcBlend::InvDstColor
        | GeSrcBlend::SrcAlpha
        | GeSrcBlend::InvSrcAlpha
        | GeSrcBlend::DstAlpha
        | GeSrcBlend::InvDstAlpha => {
            let src_reads_src_alpha =
                matches!(src, GeSrcBlend::SrcAlpha | GeSrcBlend::InvSrcAlpha);
            match dst {
                GeDstBlend::DoubleSrcAlpha => {
                    let fallback = if src_reads_src_alpha {
                        ReplaceBlend::PreSrc2xAlpha
                    } else {
                        ReplaceBlend::TwoXAlpha
                    };
                    if fetch {
                        copy_or(allow_shader_blend, fallback)
                    } else {
                        fallback
                    }
                }
                GeDstBlend::DoubleInvSrcAlpha => {
                    if src_reads_src_alpha {
                        ReplaceBlend::PreSrc2xAlpha
                    } else {
                        ReplaceBlend::TwoXAlpha
                    }
                }
                GeDstBlend::DoubleDstAlpha | GeDstBlend::DoubleInvDstAlpha => {
                    copy_unless_565(allow_shader_blend, format, ReplaceBlend::Standard)
                }
                _ => ReplaceBlend::Standard,
            }
        }
    }
}
