//! Logic-op emulation for hosts without native framebuffer logic ops.
//!
//! A handful of ops have an exact blend equivalent. The inverting ones are finished by the
//! fragment shader; the rest degrade to a plain copy and get reported.

use crate::diag::Approximation;
use crate::regs::GeLogicOp;

use super::stencil::StencilWriteMode;

/// Color blend that stands in for a logic op.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LogicOpEmulation {
    pub color: wgpu::BlendComponent,
    /// The fragment shader must output the inverted source color.
    pub shader_inverts: bool,
    pub approximation: Option<Approximation>,
}

const IDENTITY: wgpu::BlendComponent = wgpu::BlendComponent {
    src_factor: wgpu::BlendFactor::One,
    dst_factor: wgpu::BlendFactor::Zero,
    operation: wgpu::BlendOperation::Add,
};

fn is_identity(component: &wgpu::BlendComponent) -> bool {
    *component == IDENTITY
}

pub fn emulate_logic_op(op: GeLogicOp) -> LogicOpEmulation {
    let mut color = IDENTITY;
    let mut shader_inverts = false;
    let exact = match op {
        GeLogicOp::Clear => {
            color.src_factor = wgpu::BlendFactor::Zero;
            true
        }
        GeLogicOp::Copy => true,
        GeLogicOp::CopyInverted => {
            shader_inverts = true;
            true
        }
        GeLogicOp::Noop => {
            color.src_factor = wgpu::BlendFactor::Zero;
            color.dst_factor = wgpu::BlendFactor::One;
            true
        }
        GeLogicOp::Inverted => {
            // 1 - dst, with the shader writing one.
            color.dst_factor = wgpu::BlendFactor::One;
            color.operation = wgpu::BlendOperation::Subtract;
            false
        }
        GeLogicOp::Or | GeLogicOp::OrInverted => {
            // Only right when the source is saturated.
            color.dst_factor = wgpu::BlendFactor::One;
            shader_inverts = op == GeLogicOp::OrInverted;
            false
        }
        GeLogicOp::Set => {
            color.dst_factor = wgpu::BlendFactor::One;
            false
        }
        GeLogicOp::AndInverted | GeLogicOp::Nor | GeLogicOp::Nand | GeLogicOp::Equiv => {
            shader_inverts = true;
            false
        }
        GeLogicOp::And | GeLogicOp::AndReverse | GeLogicOp::Xor | GeLogicOp::OrReverse => false,
    };

    LogicOpEmulation {
        color,
        shader_inverts,
        approximation: (!exact).then_some(Approximation::LogicOpUnsupported { op }),
    }
}

/// Blend for draws that are not otherwise blended but still need the blend unit, either for a
/// stencil update through alpha or for logic-op emulation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StencilReplaceBlend {
    pub enabled: bool,
    pub color: wgpu::BlendComponent,
    pub alpha: wgpu::BlendComponent,
}

/// `emulation` is `None` when logic ops are off or handled natively.
pub fn stencil_replace_blend(
    emulation: Option<&LogicOpEmulation>,
    mode: StencilWriteMode,
) -> StencilReplaceBlend {
    let color = emulation.map_or(IDENTITY, |e| e.color);
    let accumulate = |operation| StencilReplaceBlend {
        enabled: true,
        color,
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::One,
            operation,
        },
    };

    match mode {
        StencilWriteMode::Increment(_) => accumulate(wgpu::BlendOperation::Add),
        StencilWriteMode::Decrement(_) => accumulate(wgpu::BlendOperation::Subtract),
        StencilWriteMode::Invert => accumulate(wgpu::BlendOperation::ReverseSubtract),
        _ => StencilReplaceBlend {
            enabled: !is_identity(&color),
            color,
            alpha: IDENTITY,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::stencil::StencilStep;

    #[test]
    fn exact_ops_are_not_reported() {
        for op in [
            GeLogicOp::Clear,
            GeLogicOp::Copy,
            GeLogicOp::Noop,
            GeLogicOp::CopyInverted,
        ] {
            assert_eq!(emulate_logic_op(op).approximation, None, "{op:?}");
        }
        let approximated = GeLogicOp::ALL
            .iter()
            .filter(|&&op| emulate_logic_op(op).approximation.is_some())
            .count();
        assert_eq!(approximated, 12);
    }

    #[test]
    fn clear_and_noop_blend_factors() {
        let clear = emulate_logic_op(GeLogicOp::Clear).color;
        assert_eq!(clear.src_factor, wgpu::BlendFactor::Zero);
        assert_eq!(clear.dst_factor, wgpu::BlendFactor::Zero);

        let noop = emulate_logic_op(GeLogicOp::Noop).color;
        assert_eq!(noop.src_factor, wgpu::BlendFactor::Zero);
        assert_eq!(noop.dst_factor, wgpu::BlendFactor::One);
    }

    #[test]
    fn inverted_subtracts_destination() {
        let e = emulate_logic_op(GeLogicOp::Inverted);
        assert_eq!(e.color.dst_factor, wgpu::BlendFactor::One);
        assert_eq!(e.color.operation, wgpu::BlendOperation::Subtract);
    }

    #[test]
    fn plain_draw_leaves_blend_off() {
        let blend = stencil_replace_blend(None, StencilWriteMode::Uniform);
        assert!(!blend.enabled);

        let copy = emulate_logic_op(GeLogicOp::Copy);
        assert!(!stencil_replace_blend(Some(&copy), StencilWriteMode::Keep).enabled);
    }

    #[test]
    fn stencil_steps_need_the_blend_unit() {
        let blend = stencil_replace_blend(
            None,
            StencilWriteMode::Decrement(StencilStep::Four),
        );
        assert!(blend.enabled);
        assert_eq!(blend.color, IDENTITY);
        assert_eq!(blend.alpha.operation, wgpu::BlendOperation::Subtract);
    }

    #[test]
    fn emulated_op_enables_blend() {
        let noop = emulate_logic_op(GeLogicOp::Noop);
        let blend = stencil_replace_blend(Some(&noop), StencilWriteMode::Keep);
        assert!(blend.enabled);
        assert_eq!(blend.alpha, IDENTITY);
    }
}
