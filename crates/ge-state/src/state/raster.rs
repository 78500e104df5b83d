use crate::config::{HostCaps, StateConfig};
use crate::diag::Approximation;
use crate::regs::{GeLogicOp, GePrimitive, HardwareDrawState};

use super::stencil::StencilWriteMode;
use super::tables::{
    translate_color_mask, translate_cull_face, translate_logic_op, ColorMask, LogicOperation,
};

#[derive(Clone, Debug, PartialEq)]
pub struct RasterPlan {
    pub cull: Option<wgpu::Face>,
    pub color_mask: ColorMask,
    pub dither: bool,
    /// Native logic op, for hosts that have one.
    pub logic_op: Option<LogicOperation>,
    pub approximations: Vec<Approximation>,
}

impl RasterPlan {
    pub fn color_writes(&self) -> wgpu::ColorWrites {
        translate_color_mask(self.color_mask)
    }

    pub fn primitive_state(&self, topology: wgpu::PrimitiveTopology) -> wgpu::PrimitiveState {
        let strip_index_format = matches!(
            topology,
            wgpu::PrimitiveTopology::TriangleStrip | wgpu::PrimitiveTopology::LineStrip
        )
        .then_some(wgpu::IndexFormat::Uint16);
        wgpu::PrimitiveState {
            topology,
            strip_index_format,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: self.cull,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        }
    }
}

/// A mask byte writes when its top bit is clear. Anything other than all-or-nothing is partial.
fn mask_byte_writes(byte: u8) -> bool {
    byte < 0x80
}

fn mask_byte_partial(byte: u8) -> bool {
    byte != 0x00 && byte != 0xFF
}

pub fn plan_raster(
    prim: GePrimitive,
    state: &HardwareDrawState,
    config: &StateConfig,
    caps: HostCaps,
    stencil_write: StencilWriteMode,
) -> RasterPlan {
    if state.clear_mode {
        let c = state.clear_color_mask;
        return RasterPlan {
            cull: None,
            color_mask: ColorMask {
                r: c,
                g: c,
                b: c,
                a: state.clear_alpha_mask,
            },
            dither: state.dither_enable,
            logic_op: None,
            approximations: Vec::new(),
        };
    }

    let mut approximations = Vec::new();

    let logic_op = (caps.contains(HostCaps::LOGIC_OP)
        && state.logic_op_enable
        && state.logic_op != GeLogicOp::Copy)
        .then(|| translate_logic_op(state.logic_op));

    // Through-mode coordinates are already in screen space, and rectangles are expanded to two
    // triangles whose winding depends on the corner order.
    let cull = (state.cull_enable && !state.through_mode && prim != GePrimitive::Rectangles)
        .then(|| {
            let winding = if config.use_buffered_rendering() {
                state.cull_winding
            } else {
                // Direct rendering flips Y, which flips winding.
                state.cull_winding.flipped()
            };
            translate_cull_face(winding)
        });

    let [r, g, b] = state.mask_rgb_bytes();
    if mask_byte_partial(r) || mask_byte_partial(g) || mask_byte_partial(b) {
        approximations.push(Approximation::PartialColorMask { r, g, b });
    }
    if mask_byte_partial(state.mask_alpha) {
        approximations.push(Approximation::PartialAlphaMask {
            bits: state.mask_alpha,
        });
    }

    let color_mask = ColorMask {
        r: mask_byte_writes(r),
        g: mask_byte_writes(g),
        b: mask_byte_writes(b),
        // Alpha holds the stencil; with no stencil write it must be left alone.
        a: mask_byte_writes(state.mask_alpha) && stencil_write.writes_alpha(),
    };

    RasterPlan {
        cull,
        color_mask,
        dither: state.dither_enable,
        logic_op,
        approximations,
    }
}
