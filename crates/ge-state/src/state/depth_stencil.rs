use crate::config::StateConfig;
use crate::diag::Approximation;
use crate::regs::{GeBufferFormat, GeComparison, HardwareDrawState};

use super::tables::{translate_compare, translate_stencil_op};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StencilPlan {
    pub compare: wgpu::CompareFunction,
    pub reference: u8,
    pub read_mask: u8,
    pub write_mask: u8,
    pub fail_op: wgpu::StencilOperation,
    pub depth_fail_op: wgpu::StencilOperation,
    pub pass_op: wgpu::StencilOperation,
}

impl StencilPlan {
    /// Clear-mode stencil: every covered pixel takes the reference.
    const CLEAR: StencilPlan = StencilPlan {
        compare: wgpu::CompareFunction::Always,
        reference: 0xFF,
        read_mask: 0xFF,
        write_mask: 0xFF,
        fail_op: wgpu::StencilOperation::Replace,
        depth_fail_op: wgpu::StencilOperation::Replace,
        pass_op: wgpu::StencilOperation::Replace,
    };

    fn face(&self) -> wgpu::StencilFaceState {
        wgpu::StencilFaceState {
            compare: self.compare,
            fail_op: self.fail_op,
            depth_fail_op: self.depth_fail_op,
            pass_op: self.pass_op,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DepthStencilPlan {
    pub depth_test: bool,
    pub depth_compare: wgpu::CompareFunction,
    pub depth_write: bool,
    /// `None` when the stencil test is off.
    pub stencil: Option<StencilPlan>,
    pub approximations: Vec<Approximation>,
}

impl DepthStencilPlan {
    /// Whether the draw can modify the depth buffer.
    pub fn writes_depth(&self) -> bool {
        self.depth_test && self.depth_write
    }

    /// Reference for `RenderPass::set_stencil_reference`.
    pub fn stencil_reference(&self) -> u32 {
        self.stencil.map_or(0, |s| u32::from(s.reference))
    }

    pub fn to_wgpu(&self, format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
        let stencil = match self.stencil {
            Some(s) => wgpu::StencilState {
                front: s.face(),
                back: s.face(),
                read_mask: u32::from(s.read_mask),
                write_mask: u32::from(s.write_mask),
            },
            None => wgpu::StencilState::default(),
        };
        wgpu::DepthStencilState {
            format,
            depth_write_enabled: self.writes_depth(),
            depth_compare: if self.depth_test {
                self.depth_compare
            } else {
                wgpu::CompareFunction::Always
            },
            stencil,
            bias: wgpu::DepthBiasState::default(),
        }
    }
}

/// Stencil bits the draw may modify. 5551 has a single stencil bit, so the top mask bit decides.
fn stencil_write_mask(format: GeBufferFormat, mask_alpha: u8) -> u8 {
    match format {
        GeBufferFormat::Rgba5551 => {
            if mask_alpha <= 0x7F {
                0xFF
            } else {
                0x00
            }
        }
        _ => !mask_alpha,
    }
}

pub fn plan_depth_stencil(state: &HardwareDrawState, config: &StateConfig) -> DepthStencilPlan {
    if state.clear_mode {
        let stencil = (state.clear_alpha_mask && !config.disable_stencil_test)
            .then_some(StencilPlan::CLEAR);
        return DepthStencilPlan {
            depth_test: true,
            depth_compare: wgpu::CompareFunction::Always,
            depth_write: state.clear_depth_mask || config.always_depth_write,
            stencil,
            approximations: Vec::new(),
        };
    }

    let mut approximations = Vec::new();
    if state.through_mode
        && state.depth_test_enable
        && matches!(
            state.depth_func,
            GeComparison::Equal
                | GeComparison::NotEqual
                | GeComparison::LessEqual
                | GeComparison::GreaterEqual
        )
    {
        // Through-mode depth skips the viewport transform; equality tests may not match the
        // values an earlier transformed draw wrote.
        approximations.push(Approximation::DepthEqualityInThroughMode {
            func: state.depth_func,
        });
    }

    let stencil_enabled = state.stencil_test_enable && !config.disable_stencil_test;
    let stencil = stencil_enabled.then(|| StencilPlan {
        compare: translate_compare(state.stencil_func),
        reference: state.stencil_ref,
        read_mask: state.stencil_mask,
        write_mask: stencil_write_mask(state.framebuffer_format, state.mask_alpha),
        fail_op: translate_stencil_op(state.stencil_fail),
        depth_fail_op: translate_stencil_op(state.stencil_zfail),
        pass_op: translate_stencil_op(state.stencil_zpass),
    });

    DepthStencilPlan {
        depth_test: state.depth_test_enable,
        depth_compare: if state.depth_test_enable {
            translate_compare(state.depth_func)
        } else {
            wgpu::CompareFunction::Always
        },
        depth_write: state.depth_test_enable
            && (state.depth_write_enable || config.always_depth_write),
        stencil,
        approximations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regs::GeStencilOp;

    #[test]
    fn clear_mode_writes_depth_per_mask_or_config() {
        let mut state = HardwareDrawState {
            clear_mode: true,
            ..Default::default()
        };
        let config = StateConfig::default();
        let plan = plan_depth_stencil(&state, &config);
        assert!(plan.depth_test);
        assert_eq!(plan.depth_compare, wgpu::CompareFunction::Always);
        assert!(!plan.depth_write);

        let forced = StateConfig {
            always_depth_write: true,
            ..Default::default()
        };
        assert!(plan_depth_stencil(&state, &forced).depth_write);

        state.clear_depth_mask = true;
        assert!(plan_depth_stencil(&state, &config).writes_depth());
    }

    #[test]
    fn clear_mode_stencil_replaces_unless_disabled() {
        let state = HardwareDrawState {
            clear_mode: true,
            clear_alpha_mask: true,
            ..Default::default()
        };
        let plan = plan_depth_stencil(&state, &StateConfig::default());
        assert_eq!(plan.stencil, Some(StencilPlan::CLEAR));
        assert_eq!(plan.stencil_reference(), 0xFF);

        let disabled = StateConfig {
            disable_stencil_test: true,
            ..Default::default()
        };
        assert_eq!(plan_depth_stencil(&state, &disabled).stencil, None);
    }

    #[test]
    fn stencil_write_mask_inverts_alpha_mask() {
        let state = HardwareDrawState {
            stencil_test_enable: true,
            stencil_zpass: GeStencilOp::Increment,
            mask_alpha: 0x0F,
            ..Default::default()
        };
        let stencil = plan_depth_stencil(&state, &StateConfig::default())
            .stencil
            .unwrap();
        assert_eq!(stencil.write_mask, 0xF0);
        assert_eq!(stencil.pass_op, wgpu::StencilOperation::IncrementClamp);
    }

    #[test]
    fn rgba5551_write_mask_follows_top_bit() {
        assert_eq!(stencil_write_mask(GeBufferFormat::Rgba5551, 0x7F), 0xFF);
        assert_eq!(stencil_write_mask(GeBufferFormat::Rgba5551, 0x80), 0x00);
        assert_eq!(stencil_write_mask(GeBufferFormat::Rgba4444, 0x80), 0x7F);
    }

    #[test]
    fn disabled_depth_test_never_writes() {
        let state = HardwareDrawState {
            depth_test_enable: false,
            depth_write_enable: true,
            ..Default::default()
        };
        let ds = plan_depth_stencil(&state, &StateConfig::default())
            .to_wgpu(wgpu::TextureFormat::Depth24PlusStencil8);
        assert!(!ds.depth_write_enabled);
        assert_eq!(ds.depth_compare, wgpu::CompareFunction::Always);
    }

    #[test]
    fn stencil_test_can_be_disabled_globally() {
        let state = HardwareDrawState {
            stencil_test_enable: true,
            stencil_func: GeComparison::Equal,
            stencil_zpass: GeStencilOp::Replace,
            ..Default::default()
        };
        let disabled = StateConfig {
            disable_stencil_test: true,
            ..Default::default()
        };
        let plan = plan_depth_stencil(&state, &disabled);
        assert_eq!(plan.stencil, None);
        assert_eq!(plan.stencil_reference(), 0);
        assert!(plan_depth_stencil(&state, &StateConfig::default())
            .stencil
            .is_some());
    }

    #[test]
    fn forced_depth_write_applies_outside_clear_mode() {
        let state = HardwareDrawState {
            depth_test_enable: true,
            depth_func: GeComparison::LessEqual,
            depth_write_enable: false,
            ..Default::default()
        };
        assert!(!plan_depth_stencil(&state, &StateConfig::default()).writes_depth());

        let forced = StateConfig {
            always_depth_write: true,
            ..Default::default()
        };
        let plan = plan_depth_stencil(&state, &forced);
        assert!(plan.writes_depth());
        assert_eq!(plan.depth_compare, wgpu::CompareFunction::LessEqual);

        // Without a depth test nothing is written either way.
        let untested = HardwareDrawState {
            depth_test_enable: false,
            ..state
        };
        assert!(!plan_depth_stencil(&untested, &forced).writes_depth());
    }

    #[test]
    fn through_mode_equality_is_noted() {
        let state = HardwareDrawState {
            through_mode: true,
            depth_test_enable: true,
            depth_func: GeComparison::Equal,
            ..Default::default()
        };
        let plan = plan_depth_stencil(&state, &StateConfig::default());
        assert_eq!(
            plan.approximations,
            vec![Approximation::DepthEqualityInThroughMode {
                func: GeComparison::Equal
            }]
        );
    }
}
