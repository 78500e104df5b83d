//! Static GE -> host enum mappings.

use crate::regs::{
    CullWinding, GeBlendMode, GeComparison, GeDstBlend, GeLogicOp, GeSrcBlend, GeStencilOp,
};

/// Framebuffer logic operation for backends that expose one natively (wgpu does not).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogicOperation {
    Clear,
    And,
    AndReverse,
    Copy,
    AndInverted,
    NoOp,
    Xor,
    Or,
    Nor,
    Equivalent,
    Invert,
    OrReverse,
    CopyInverted,
    OrInverted,
    Nand,
    Set,
}

/// Per-channel "write enabled" flags, already reduced from the GE per-bit masks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColorMask {
    pub r: bool,
    pub g: bool,
    pub b: bool,
    pub a: bool,
}

impl ColorMask {
    pub const ALL: ColorMask = ColorMask {
        r: true,
        g: true,
        b: true,
        a: true,
    };
}

/// The doubled selectors map to their single counterparts; the doubling happens in the shader
/// (or not at all).
pub fn translate_src_blend(factor: GeSrcBlend) -> wgpu::BlendFactor {
    match factor {
        GeSrcBlend::DstColor => wgpu::BlendFactor::Dst,
        GeSrcBlend::InvDstColor => wgpu::BlendFactor::OneMinusDst,
        GeSrcBlend::SrcAlpha | GeSrcBlend::DoubleSrcAlpha => wgpu::BlendFactor::SrcAlpha,
        GeSrcBlend::InvSrcAlpha | GeSrcBlend::DoubleInvSrcAlpha => {
            wgpu::BlendFactor::OneMinusSrcAlpha
        }
        GeSrcBlend::DstAlpha | GeSrcBlend::DoubleDstAlpha => wgpu::BlendFactor::DstAlpha,
        GeSrcBlend::InvDstAlpha | GeSrcBlend::DoubleInvDstAlpha => {
            wgpu::BlendFactor::OneMinusDstAlpha
        }
        GeSrcBlend::FixA => wgpu::BlendFactor::Constant,
    }
}

pub fn translate_dst_blend(factor: GeDstBlend) -> wgpu::BlendFactor {
    match factor {
        GeDstBlend::SrcColor => wgpu::BlendFactor::Src,
        GeDstBlend::InvSrcColor => wgpu::BlendFactor::OneMinusSrc,
        GeDstBlend::SrcAlpha | GeDstBlend::DoubleSrcAlpha => wgpu::BlendFactor::SrcAlpha,
        GeDstBlend::InvSrcAlpha | GeDstBlend::DoubleInvSrcAlpha => {
            wgpu::BlendFactor::OneMinusSrcAlpha
        }
        GeDstBlend::DstAlpha | GeDstBlend::DoubleDstAlpha => wgpu::BlendFactor::DstAlpha,
        GeDstBlend::InvDstAlpha | GeDstBlend::DoubleInvDstAlpha => {
            wgpu::BlendFactor::OneMinusDstAlpha
        }
        GeDstBlend::FixB => wgpu::BlendFactor::Constant,
    }
}

/// `minmax` selects the table for hosts with min/max blend operations. ABSDIFF has no host
/// equivalent either way; `Max` is the closer guess when available.
pub fn translate_blend_equation(eq: GeBlendMode, minmax: bool) -> wgpu::BlendOperation {
    match eq {
        GeBlendMode::Add => wgpu::BlendOperation::Add,
        GeBlendMode::Subtract => wgpu::BlendOperation::Subtract,
        GeBlendMode::ReverseSubtract => wgpu::BlendOperation::ReverseSubtract,
        GeBlendMode::Min if minmax => wgpu::BlendOperation::Min,
        GeBlendMode::Max | GeBlendMode::AbsDiff if minmax => wgpu::BlendOperation::Max,
        GeBlendMode::Min | GeBlendMode::Max | GeBlendMode::AbsDiff => wgpu::BlendOperation::Add,
    }
}

pub fn translate_compare(func: GeComparison) -> wgpu::CompareFunction {
    match func {
        GeComparison::Never => wgpu::CompareFunction::Never,
        GeComparison::Always => wgpu::CompareFunction::Always,
        GeComparison::Equal => wgpu::CompareFunction::Equal,
        GeComparison::NotEqual => wgpu::CompareFunction::NotEqual,
        GeComparison::Less => wgpu::CompareFunction::Less,
        GeComparison::LessEqual => wgpu::CompareFunction::LessEqual,
        GeComparison::Greater => wgpu::CompareFunction::Greater,
        GeComparison::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
    }
}

pub fn translate_stencil_op(op: GeStencilOp) -> wgpu::StencilOperation {
    match op {
        GeStencilOp::Keep | GeStencilOp::Reserved6 | GeStencilOp::Reserved7 => {
            wgpu::StencilOperation::Keep
        }
        GeStencilOp::Zero => wgpu::StencilOperation::Zero,
        GeStencilOp::Replace => wgpu::StencilOperation::Replace,
        GeStencilOp::Invert => wgpu::StencilOperation::Invert,
        GeStencilOp::Increment => wgpu::StencilOperation::IncrementClamp,
        GeStencilOp::Decrement => wgpu::StencilOperation::DecrementClamp,
    }
}

/// Face culled for a winding, assuming counter-clockwise front faces.
pub fn translate_cull_face(winding: CullWinding) -> wgpu::Face {
    match winding {
        CullWinding::Cw => wgpu::Face::Front,
        CullWinding::Ccw => wgpu::Face::Back,
    }
}

pub fn translate_logic_op(op: GeLogicOp) -> LogicOperation {
    match op {
        GeLogicOp::Clear => LogicOperation::Clear,
        GeLogicOp::And => LogicOperation::And,
        GeLogicOp::AndReverse => LogicOperation::AndReverse,
        GeLogicOp::Copy => LogicOperation::Copy,
        GeLogicOp::AndInverted => LogicOperation::AndInverted,
        GeLogicOp::Noop => LogicOperation::NoOp,
        GeLogicOp::Xor => LogicOperation::Xor,
        GeLogicOp::Or => LogicOperation::Or,
        GeLogicOp::Nor => LogicOperation::Nor,
        GeLogicOp::Equiv => LogicOperation::Equivalent,
        GeLogicOp::Inverted => LogicOperation::Invert,
        GeLogicOp::OrReverse => LogicOperation::OrReverse,
        GeLogicOp::CopyInverted => LogicOperation::CopyInverted,
        GeLogicOp::OrInverted => LogicOperation::OrInverted,
        GeLogicOp::Nand => LogicOperation::Nand,
        GeLogicOp::Set => LogicOperation::Set,
    }
}

pub fn translate_color_mask(mask: ColorMask) -> wgpu::ColorWrites {
    let mut out = wgpu::ColorWrites::empty();
    if mask.r {
        out |= wgpu::ColorWrites::RED;
    }
    if mask.g {
        out |= wgpu::ColorWrites::GREEN;
    }
    if mask.b {
        out |= wgpu::ColorWrites::BLUE;
    }
    if mask.a {
        out |= wgpu::ColorWrites::ALPHA;
    }
    out
}

/// Rewrite source-alpha factors to read the shader's second output.
pub fn to_dual_source(factor: wgpu::BlendFactor) -> wgpu::BlendFactor {
    match factor {
        wgpu::BlendFactor::SrcAlpha => wgpu::BlendFactor::Src1Alpha,
        wgpu::BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrc1Alpha,
        other => other,
    }
}
