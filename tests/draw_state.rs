use ge_state::config::RenderingMode;
use ge_state::fallback::FRAME_COPY_LIMIT;
use ge_state::host::{
    BlendUniforms, DirtyUniforms, FramebufferManager, RenderStateSink, ShaderManager, TextureCache,
};
use ge_state::regs::{
    cmd, GeBlendMode, GeDstBlend, GeScissor, GeSrcBlend, GeStencilOp, GeViewport,
};
use ge_state::state::{
    DepthStencilPlan, RasterPlan, RenderTargetInfo, ReplaceBlend, ResolvedBlendPlan, ScissorRect,
    ViewportScissorPlan,
};
use ge_state::{
    DrawStateEngine, GePrimitive, GeRegisterFile, HardwareDrawState, HostCaps, StateConfig,
};
use pretty_assertions::assert_eq;

#[derive(Clone, Debug, PartialEq)]
enum Call {
    SetTexture,
    ApplyTexture,
    BindTestTexture,
    DepthUpdated,
    BindFramebufferColor,
    UnbindFramebufferColor,
    Dirty(DirtyUniforms),
    BlendUniforms,
    SetBlend,
    SetRaster,
    SetDepthStencil,
    SetViewportScissor(Option<ScissorRect>),
}

#[derive(Default)]
struct RecordingHost {
    target: RenderTargetInfo,
    flip: u64,
    texture_changed: bool,
    needs_clamp: bool,
    calls: Vec<Call>,
}

impl RecordingHost {
    fn take(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    fn dirtied(&self) -> DirtyUniforms {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Dirty(d) => Some(*d),
                _ => None,
            })
            .fold(DirtyUniforms::empty(), |a, b| a | b)
    }
}

impl FramebufferManager for RecordingHost {
    fn target_info(&self) -> RenderTargetInfo {
        self.target
    }

    fn flip_count(&self) -> u64 {
        self.flip
    }

    fn set_depth_updated(&mut self) {
        self.calls.push(Call::DepthUpdated);
    }

    fn bind_framebuffer_color(&mut self) {
        self.calls.push(Call::BindFramebufferColor);
    }

    fn unbind_framebuffer_color(&mut self) {
        self.calls.push(Call::UnbindFramebufferColor);
    }
}

impl TextureCache for RecordingHost {
    fn texture_changed(&self) -> bool {
        self.texture_changed
    }

    fn set_texture(&mut self) -> bool {
        self.calls.push(Call::SetTexture);
        self.texture_changed = false;
        self.needs_clamp
    }

    fn apply_texture(&mut self) {
        self.calls.push(Call::ApplyTexture);
    }

    fn bind_test_texture(&mut self) {
        self.calls.push(Call::BindTestTexture);
    }
}

impl ShaderManager for RecordingHost {
    fn dirty_uniforms(&mut self, dirty: DirtyUniforms) {
        self.calls.push(Call::Dirty(dirty));
    }

    fn upload_blend_uniforms(&mut self, _uniforms: &BlendUniforms) {
        self.calls.push(Call::BlendUniforms);
    }
}

impl RenderStateSink for RecordingHost {
    fn set_blend(&mut self, _blend: &ResolvedBlendPlan) {
        self.calls.push(Call::SetBlend);
    }

    fn set_raster(&mut self, _raster: &RasterPlan) {
        self.calls.push(Call::SetRaster);
    }

    fn set_depth_stencil(&mut self, _depth_stencil: &DepthStencilPlan) {
        self.calls.push(Call::SetDepthStencil);
    }

    fn set_viewport_scissor(&mut self, viewport: &ViewportScissorPlan) {
        self.calls.push(Call::SetViewportScissor(viewport.scissor));
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn absdiff_blend() -> HardwareDrawState {
    HardwareDrawState {
        alpha_blend_enable: true,
        blend_src: GeSrcBlend::SrcAlpha,
        blend_dst: GeDstBlend::InvSrcAlpha,
        blend_eq: GeBlendMode::AbsDiff,
        ..Default::default()
    }
}

fn draw(
    engine: &mut DrawStateEngine,
    state: &HardwareDrawState,
    host: &mut RecordingHost,
) -> ReplaceBlend {
    let plan = engine.apply_draw_state(GePrimitive::Triangles, state, host);
    engine.apply_late_state(state, host);
    plan.blend.replace_blend
}

#[test]
fn copy_budget_exhausts_and_recovers_on_flip() {
    init_tracing();
    let mut engine = DrawStateEngine::new(StateConfig::default(), HostCaps::BLEND_MINMAX);
    let mut host = RecordingHost::default();
    let state = absdiff_blend();

    for i in 0..FRAME_COPY_LIMIT {
        assert_eq!(
            draw(&mut engine, &state, &mut host),
            ReplaceBlend::CopyFbo,
            "draw {i}"
        );
    }
    assert_eq!(
        host.count(&Call::BindFramebufferColor),
        FRAME_COPY_LIMIT as usize
    );

    // The next copy is refused and the draw falls back to fixed-function blending.
    assert_eq!(draw(&mut engine, &state, &mut host), ReplaceBlend::Standard);
    assert!(engine.shader_blend_suspended());
    assert_eq!(engine.stats().snapshot().framebuffer_copies_refused, 1);
    assert_eq!(draw(&mut engine, &state, &mut host), ReplaceBlend::Standard);

    host.flip += 1;
    assert_eq!(draw(&mut engine, &state, &mut host), ReplaceBlend::CopyFbo);
    assert!(!engine.shader_blend_suspended());
}

#[test]
fn begin_frame_restores_shader_blending() {
    let mut engine = DrawStateEngine::new(StateConfig::default(), HostCaps::BLEND_MINMAX);
    let mut host = RecordingHost::default();
    let state = absdiff_blend();

    for _ in 0..=FRAME_COPY_LIMIT {
        draw(&mut engine, &state, &mut host);
    }
    assert!(engine.shader_blend_suspended());

    host.take();
    engine.begin_frame(&mut host);
    // The refused draw already released the copy.
    assert_eq!(host.take(), vec![]);
    assert_eq!(draw(&mut engine, &state, &mut host), ReplaceBlend::CopyFbo);
}

#[test]
fn leaving_shader_blend_unbinds_copy() {
    let mut engine = DrawStateEngine::new(StateConfig::default(), HostCaps::BLEND_MINMAX);
    let mut host = RecordingHost::default();

    draw(&mut engine, &absdiff_blend(), &mut host);
    assert_eq!(host.count(&Call::BindFramebufferColor), 1);

    draw(&mut engine, &HardwareDrawState::default(), &mut host);
    assert_eq!(host.count(&Call::UnbindFramebufferColor), 1);
}

#[test]
fn disabled_framebuffer_effects_never_copy() {
    let config = StateConfig {
        disable_slow_framebuffer_effects: true,
        ..Default::default()
    };
    let mut engine = DrawStateEngine::new(config, HostCaps::BLEND_MINMAX);
    let mut host = RecordingHost::default();

    for _ in 0..3 {
        assert_eq!(
            draw(&mut engine, &absdiff_blend(), &mut host),
            ReplaceBlend::Standard
        );
    }
    assert_eq!(host.count(&Call::BindFramebufferColor), 0);
    assert_eq!(engine.stats().snapshot().approximated_draws, 3);
    // Reported once, however many draws hit it.
    assert_eq!(engine.diagnostics().reported_count(), 1);
}

#[test]
fn redundant_state_is_not_reissued() {
    let mut engine = DrawStateEngine::new(StateConfig::default(), HostCaps::BLEND_MINMAX);
    let mut host = RecordingHost::default();
    let state = HardwareDrawState::default();

    engine.apply_draw_state(GePrimitive::Triangles, &state, &mut host);
    let first = host.take();
    assert!(first.contains(&Call::SetBlend));
    assert!(first.contains(&Call::SetRaster));
    assert!(first.contains(&Call::SetDepthStencil));
    assert!(first.contains(&Call::Dirty(DirtyUniforms::PROJ_MATRIX)));

    engine.apply_draw_state(GePrimitive::Triangles, &state, &mut host);
    assert_eq!(host.take(), vec![]);

    engine.invalidate_cache();
    engine.apply_draw_state(GePrimitive::Triangles, &state, &mut host);
    assert_eq!(host.take(), first);

    let stats = engine.stats().snapshot();
    assert_eq!(stats.draws, 3);
    assert_eq!(stats.state_calls_skipped, 4);
}

#[test]
fn sink_calls_follow_fixed_order() {
    let mut engine = DrawStateEngine::new(StateConfig::default(), HostCaps::BLEND_MINMAX);
    let mut host = RecordingHost {
        texture_changed: true,
        needs_clamp: true,
        ..Default::default()
    };
    let state = HardwareDrawState {
        texture_map_enable: true,
        depth_test_enable: true,
        ..Default::default()
    };
    engine.apply_draw_state(GePrimitive::Triangles, &state, &mut host);
    assert_eq!(
        host.take(),
        vec![
            Call::SetTexture,
            Call::DepthUpdated,
            Call::Dirty(DirtyUniforms::TEX_CLAMP | DirtyUniforms::PROJ_MATRIX),
            Call::SetBlend,
            Call::SetRaster,
            Call::SetDepthStencil,
            Call::SetViewportScissor(None),
        ]
    );
}

#[test]
fn direct_rendering_flips_scissor_y() {
    let state = HardwareDrawState {
        scissor: GeScissor {
            x1: 10,
            y1: 20,
            x2: 109,
            y2: 69,
        },
        ..Default::default()
    };
    let mut host = RecordingHost::default();

    let mut buffered = DrawStateEngine::new(StateConfig::default(), HostCaps::empty());
    let plan = buffered.apply_draw_state(GePrimitive::Triangles, &state, &mut host);
    assert_eq!(
        plan.viewport.scissor,
        Some(ScissorRect {
            x: 10,
            y: 20,
            width: 100,
            height: 50,
        })
    );

    let direct = StateConfig {
        rendering_mode: RenderingMode::Direct,
        ..Default::default()
    };
    let mut engine = DrawStateEngine::new(direct, HostCaps::empty());
    let plan = engine.apply_draw_state(GePrimitive::Triangles, &state, &mut host);
    // 272 - 50 - 20
    assert_eq!(
        plan.viewport.scissor,
        Some(ScissorRect {
            x: 10,
            y: 202,
            width: 100,
            height: 50,
        })
    );
    assert_eq!(plan.viewport.viewport.y, 0.0);
}

#[test]
fn direct_rendering_flips_viewport_y() {
    // 100 rows starting at row 50.
    let state = HardwareDrawState {
        viewport: GeViewport {
            y_scale: -50.0,
            y_center: 2048.0,
            offset_y: 1948.0,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut host = RecordingHost::default();

    let mut buffered = DrawStateEngine::new(StateConfig::default(), HostCaps::empty());
    let plan = buffered.apply_draw_state(GePrimitive::Triangles, &state, &mut host);
    assert_eq!(plan.viewport.viewport.y, 50.0);
    assert_eq!(plan.viewport.viewport.height, 100.0);

    let direct = StateConfig {
        rendering_mode: RenderingMode::Direct,
        ..Default::default()
    };
    let mut engine = DrawStateEngine::new(direct, HostCaps::empty());
    let plan = engine.apply_draw_state(GePrimitive::Triangles, &state, &mut host);
    // 272 - 100 - 50
    assert_eq!(plan.viewport.viewport.y, 122.0);
    assert_eq!(plan.viewport.viewport.height, 100.0);
    assert!(plan.viewport.projection.is_identity());
}

#[test]
fn clear_mode_skips_textures_and_writes_stencil() {
    let mut engine = DrawStateEngine::new(StateConfig::default(), HostCaps::empty());
    let mut host = RecordingHost {
        texture_changed: true,
        ..Default::default()
    };
    let state = HardwareDrawState {
        clear_mode: true,
        clear_color_mask: true,
        clear_alpha_mask: true,
        clear_depth_mask: true,
        texture_map_enable: true,
        alpha_test_enable: true,
        ..Default::default()
    };
    let plan = engine.apply_draw_state(GePrimitive::Rectangles, &state, &mut host);
    engine.apply_late_state(&state, &mut host);

    assert_eq!(host.count(&Call::SetTexture), 0);
    assert_eq!(host.count(&Call::ApplyTexture), 0);
    assert_eq!(host.count(&Call::BindTestTexture), 0);
    assert_eq!(host.count(&Call::DepthUpdated), 1);
    assert!(!plan.blend.enabled);
    assert_eq!(plan.raster.color_writes(), wgpu::ColorWrites::ALL);
    let stencil = plan.depth_stencil.stencil.unwrap();
    assert_eq!(stencil.pass_op, wgpu::StencilOperation::Replace);
    assert_eq!(stencil.compare, wgpu::CompareFunction::Always);
}

#[test]
fn late_state_binds_test_texture_then_applies() {
    let mut engine = DrawStateEngine::new(StateConfig::default(), HostCaps::BLEND_MINMAX);
    let mut host = RecordingHost::default();
    let state = HardwareDrawState {
        color_test_enable: true,
        ..absdiff_blend()
    };
    engine.apply_draw_state(GePrimitive::Triangles, &state, &mut host);
    assert!(host.dirtied().contains(DirtyUniforms::SHADER_BLEND));
    assert!(host.calls.contains(&Call::BlendUniforms));
    host.take();

    engine.apply_late_state(&state, &mut host);
    assert_eq!(
        host.take(),
        vec![
            Call::BindTestTexture,
            Call::ApplyTexture,
            Call::BindFramebufferColor
        ]
    );
}

#[test]
fn registers_decode_into_engine_plan() {
    let mut regs = GeRegisterFile::new();
    regs.write(cmd::STENCIL_TEST_ENABLE, 1);
    // func ALWAYS, ref 0x40, mask 0xFF
    regs.write(cmd::STENCIL_TEST, 0x01 | (0x40 << 8) | (0xFF << 16));
    // fail/zfail keep, zpass replace
    regs.write(cmd::STENCIL_OP, (GeStencilOp::Replace as u32) << 16);
    regs.write(cmd::FRAMEBUF_PIXEL_FORMAT, 3);
    let state = HardwareDrawState::from_registers(&regs);

    let mut engine = DrawStateEngine::new(StateConfig::default(), HostCaps::empty());
    let mut host = RecordingHost::default();
    let plan = engine.apply_draw_state(GePrimitive::Triangles, &state, &mut host);

    let stencil = plan.depth_stencil.stencil.unwrap();
    assert_eq!(stencil.reference, 0x40);
    assert_eq!(stencil.compare, wgpu::CompareFunction::Always);
    assert_eq!(stencil.pass_op, wgpu::StencilOperation::Replace);
    assert!(plan.raster.color_mask.a);
}
