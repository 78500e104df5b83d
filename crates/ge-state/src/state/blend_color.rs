//! Mapping the GE's two fixed blend colors onto the host's single blend constant.
//!
//! The host has one RGBA blend constant; the GE has a fixed color for each side of the blend.
//! Unit colors become ZERO/ONE factors so the constant stays free, and when both sides still need
//! it the colors are reconciled heuristically.

use crate::diag::Approximation;
use crate::regs::{GeDstBlend, GeSrcBlend};

/// Channels within this distance of 0 or 1 may be rounded to a unit factor.
pub const UNIT_MARGIN: f32 = 0.01;
/// Distance under which two fixed colors (or one and the other's complement) share the constant.
pub const SIMILAR_MARGIN: f32 = 0.1;
/// Distance under which a conflicting fixed color is forced to a unit factor.
pub const CONFLICT_MARGIN: f32 = 0.25;

/// Unpack a 24-bit `0xBBGGRR` color to normalized RGB.
pub fn fixed_color_rgb(fix: u32) -> [f32; 3] {
    [
        (fix & 0xFF) as f32 / 255.0,
        ((fix >> 8) & 0xFF) as f32 / 255.0,
        ((fix >> 16) & 0xFF) as f32 / 255.0,
    ]
}

pub fn colors_similar(a: [f32; 3], b: [f32; 3], margin: f32) -> bool {
    a.iter().zip(b.iter()).all(|(a, b)| (a - b).abs() <= margin)
}

fn complement(c: [f32; 3]) -> [f32; 3] {
    [1.0 - c[0], 1.0 - c[1], 1.0 - c[2]]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FixedColorFactor {
    /// Expressible as a unit factor. `approximate` is set when the color was only near the unit.
    Unit {
        factor: wgpu::BlendFactor,
        approximate: bool,
    },
    /// Needs the blend constant.
    NeedsConstant,
}

impl FixedColorFactor {
    pub fn factor(self) -> Option<wgpu::BlendFactor> {
        match self {
            FixedColorFactor::Unit { factor, .. } => Some(factor),
            FixedColorFactor::NeedsConstant => None,
        }
    }

    pub fn is_approximate(self) -> bool {
        matches!(
            self,
            FixedColorFactor::Unit {
                approximate: true,
                ..
            }
        )
    }
}

pub fn resolve_fixed_color(fix: u32) -> FixedColorFactor {
    let fix = fix & 0x00FF_FFFF;
    if fix == 0x00FF_FFFF {
        return FixedColorFactor::Unit {
            factor: wgpu::BlendFactor::One,
            approximate: false,
        };
    }
    if fix == 0 {
        return FixedColorFactor::Unit {
            factor: wgpu::BlendFactor::Zero,
            approximate: false,
        };
    }

    let rgb = fixed_color_rgb(fix);
    if rgb.iter().all(|&c| c >= 1.0 - UNIT_MARGIN) {
        FixedColorFactor::Unit {
            factor: wgpu::BlendFactor::One,
            approximate: true,
        }
    } else if rgb.iter().all(|&c| c <= UNIT_MARGIN) {
        FixedColorFactor::Unit {
            factor: wgpu::BlendFactor::Zero,
            approximate: true,
        }
    } else {
        FixedColorFactor::NeedsConstant
    }
}

/// One side of the blend as seen by the reconciler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlendSide {
    /// Host factor chosen so far; `None` when the fixed color needs the constant.
    pub factor: Option<wgpu::BlendFactor>,
    /// The selector is the fixed color.
    pub is_fixed: bool,
    /// The factor is a rounded fixed color.
    pub approximate: bool,
    pub fix: u32,
}

impl BlendSide {
    /// Side for a non-fixed selector.
    pub fn table(factor: wgpu::BlendFactor) -> Self {
        Self {
            factor: Some(factor),
            is_fixed: false,
            approximate: false,
            fix: 0,
        }
    }

    pub fn fixed(fix: u32) -> Self {
        let resolved = resolve_fixed_color(fix);
        Self {
            factor: resolved.factor(),
            is_fixed: true,
            approximate: resolved.is_approximate(),
            fix,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FixedColorPlan {
    pub src: wgpu::BlendFactor,
    pub dst: wgpu::BlendFactor,
    /// RGB to upload as the blend constant, if any.
    pub constant_rgb: Option<[f32; 3]>,
    pub approximations: Vec<Approximation>,
}

impl FixedColorPlan {
    pub fn is_approximate(&self) -> bool {
        !self.approximations.is_empty()
    }
}

/// Choose final source/destination factors when either selector is a fixed color.
///
/// `pre_src` means the shader already multiplied the source by its fixed color, so the source
/// side must not be turned back into a constant.
pub fn reconcile_fixed_colors(
    src: BlendSide,
    dst: BlendSide,
    src_sel: GeSrcBlend,
    dst_sel: GeDstBlend,
    pre_src: bool,
) -> FixedColorPlan {
    let a_rgb = fixed_color_rgb(src.fix);
    let b_rgb = fixed_color_rgb(dst.fix);
    let mut approximations = Vec::new();

    let rounded = |side: &BlendSide, out: &mut Vec<Approximation>| {
        if side.approximate {
            out.push(Approximation::FixedColorRounded { fix: side.fix });
        }
    };

    let (src_factor, dst_factor, constant_rgb) = match (src.factor, dst.factor) {
        (None, Some(dst_factor)) => {
            rounded(&dst, &mut approximations);
            (wgpu::BlendFactor::Constant, dst_factor, Some(a_rgb))
        }
        (Some(src_factor), None) => {
            rounded(&src, &mut approximations);
            (src_factor, wgpu::BlendFactor::Constant, Some(b_rgb))
        }
        (None, None) => {
            if colors_similar(a_rgb, complement(b_rgb), SIMILAR_MARGIN) {
                (
                    wgpu::BlendFactor::Constant,
                    wgpu::BlendFactor::OneMinusConstant,
                    Some(a_rgb),
                )
            } else if colors_similar(a_rgb, b_rgb, SIMILAR_MARGIN) {
                (
                    wgpu::BlendFactor::Constant,
                    wgpu::BlendFactor::Constant,
                    Some(a_rgb),
                )
            } else {
                approximations.push(Approximation::FixedColorConflict {
                    fix_a: src.fix,
                    fix_b: dst.fix,
                    src: src_sel,
                    dst: dst_sel,
                });
                let near_zero_a = colors_similar(a_rgb, [0.0; 3], CONFLICT_MARGIN);
                let near_zero_b = colors_similar(b_rgb, [0.0; 3], CONFLICT_MARGIN);
                if near_zero_a || colors_similar(a_rgb, [1.0; 3], CONFLICT_MARGIN) {
                    let src_factor = if near_zero_a {
                        wgpu::BlendFactor::Zero
                    } else {
                        wgpu::BlendFactor::One
                    };
                    (src_factor, wgpu::BlendFactor::Constant, Some(b_rgb))
                } else {
                    let dst_factor = if near_zero_b {
                        wgpu::BlendFactor::Zero
                    } else {
                        wgpu::BlendFactor::One
                    };
                    (wgpu::BlendFactor::Constant, dst_factor, Some(a_rgb))
                }
            }
        }
        (Some(src_factor), Some(dst_factor)) => {
            // Both fit a unit factor; spend the constant on whichever was rounded.
            if src.is_fixed && !pre_src && src.approximate {
                rounded(&dst, &mut approximations);
                (wgpu::BlendFactor::Constant, dst_factor, Some(a_rgb))
            } else if dst.approximate {
                rounded(&src, &mut approximations);
                (src_factor, wgpu::BlendFactor::Constant, Some(b_rgb))
            } else {
                rounded(&src, &mut approximations);
                (src_factor, dst_factor, None)
            }
        }
    };

    FixedColorPlan {
        src: src_factor,
        dst: dst_factor,
        constant_rgb,
        approximations,
    }
}
