//! Viewport and scissor placement on the host render target.
//!
//! GE coordinates are in emulated framebuffer pixels. The host target may be upscaled
//! (buffered rendering) or be the display surface itself (direct rendering, whose Y axis runs the
//! other way). Viewports reaching past the target are clipped and the difference is handed to the
//! vertex shader as a [`ProjectionAdjust`].

use crate::config::StateConfig;
use crate::regs::HardwareDrawState;

/// Native display size.
pub const GE_DISPLAY_WIDTH: f32 = 480.0;
pub const GE_DISPLAY_HEIGHT: f32 = 272.0;

/// Depth values are 16-bit.
const DEPTH_RANGE: f32 = 65535.0;

/// Sizes the framebuffer manager reports for the current target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderTargetInfo {
    /// Emulated target size in GE pixels.
    pub buffer_width: u32,
    pub buffer_height: u32,
    /// Host target size in pixels.
    pub render_width: u32,
    pub render_height: u32,
    /// Horizontal offset of the target inside a shared host buffer, in GE pixels.
    pub offset_x: u32,
    /// Host surface size, used for direct rendering.
    pub display_width: u32,
    pub display_height: u32,
}

impl Default for RenderTargetInfo {
    fn default() -> Self {
        Self {
            buffer_width: 480,
            buffer_height: 272,
            render_width: 480,
            render_height: 272,
            offset_x: 0,
            display_width: 480,
            display_height: 272,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Clip-space correction for a viewport that was clipped to the render target:
/// `ndc' = ndc * scale + offset`, with Y pointing up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectionAdjust {
    pub x_scale: f32,
    pub y_scale: f32,
    pub x_offset: f32,
    pub y_offset: f32,
    /// -1 when the GE depth range runs backwards and had to be swapped for the host.
    pub z_scale: f32,
}

impl ProjectionAdjust {
    pub const IDENTITY: ProjectionAdjust = ProjectionAdjust {
        x_scale: 1.0,
        y_scale: 1.0,
        x_offset: 0.0,
        y_offset: 0.0,
        z_scale: 1.0,
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for ProjectionAdjust {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportScissorPlan {
    pub viewport: Viewport,
    /// `None` when scissoring is off.
    pub scissor: Option<ScissorRect>,
    pub projection: ProjectionAdjust,
}

/// One axis of a viewport clipped to `[min, max]`. Returns `(start, size, scale, offset)` where
/// scale/offset map the unclipped NDC range onto the clipped one.
fn clip_axis(start: f32, size: f32, min: f32, max: f32) -> (f32, f32, f32, f32) {
    let end = start + size;
    let clipped_start = start.max(min);
    let clipped_end = end.min(max);
    if size <= 0.0 || clipped_end <= clipped_start || (clipped_start == start && clipped_end == end)
    {
        return (start, size, 1.0, 0.0);
    }
    let clipped_size = clipped_end - clipped_start;
    let center = start + size * 0.5;
    let clipped_center = clipped_start + clipped_size * 0.5;
    (
        clipped_start,
        clipped_size,
        size / clipped_size,
        2.0 * (center - clipped_center) / clipped_size,
    )
}

fn to_pixels(v: f32) -> u32 {
    v.round().max(0.0) as u32
}

pub fn plan_viewport_scissor(
    state: &HardwareDrawState,
    target: &RenderTargetInfo,
    config: &StateConfig,
) -> ViewportScissorPlan {
    let buffered = config.use_buffered_rendering();
    let (width_factor, height_factor) = if buffered {
        (
            target.render_width as f32 / target.buffer_width.max(1) as f32,
            target.render_height as f32 / target.buffer_height.max(1) as f32,
        )
    } else {
        (
            target.display_width as f32 / GE_DISPLAY_WIDTH,
            target.display_height as f32 / GE_DISPLAY_HEIGHT,
        )
    };
    let render_x = target.offset_x as f32 * width_factor;
    let render_y = 0.0;
    let rt_width = target.buffer_width as f32 * width_factor;
    let rt_height = target.buffer_height as f32 * height_factor;

    // Direct rendering puts the origin at the bottom of the surface.
    let flip_y = |y: f32, h: f32| {
        if buffered {
            y
        } else {
            target.display_height as f32 - h - y
        }
    };

    let scissor = if config.stereo_rendering {
        None
    } else {
        let s = state.scissor;
        let x1 = u32::from(s.x1);
        let y1 = u32::from(s.y1);
        let x2 = u32::from(s.x2) + 1;
        let y2 = u32::from(s.y2) + 1;
        let covers_target =
            x1 == 0 && y1 == 0 && x2 >= target.buffer_width && y2 >= target.buffer_height;
        if buffered && covers_target {
            None
        } else {
            let w = x2.saturating_sub(x1) as f32 * width_factor;
            let h = y2.saturating_sub(y1) as f32 * height_factor;
            let x = render_x + x1 as f32 * width_factor;
            let y = flip_y(render_y + y1 as f32 * height_factor, h);
            Some(ScissorRect {
                x: to_pixels(x),
                y: to_pixels(y),
                width: to_pixels(w),
                height: to_pixels(h),
            })
        }
    };

    if state.through_mode {
        return ViewportScissorPlan {
            viewport: Viewport {
                x: render_x,
                y: flip_y(render_y, rt_height),
                width: rt_width,
                height: rt_height,
                min_depth: 0.0,
                max_depth: 1.0,
            },
            scissor,
            projection: ProjectionAdjust::IDENTITY,
        };
    }

    let vp = state.viewport;
    let x0 = vp.x_center - vp.offset_x - vp.x_scale.abs();
    let y0 = vp.y_center - vp.offset_y - vp.y_scale.abs();
    let left = render_x + x0 * width_factor;
    let top = render_y + y0 * height_factor;
    let width = 2.0 * vp.x_scale.abs() * width_factor;
    let height = 2.0 * vp.y_scale.abs() * height_factor;

    let (x, w, x_scale, x_offset) = clip_axis(left, width, render_x, render_x + rt_width);
    let (y, h, y_scale, y_down_offset) = clip_axis(top, height, render_y, render_y + rt_height);

    let near = (vp.z_center - vp.z_scale) / DEPTH_RANGE;
    let far = (vp.z_center + vp.z_scale) / DEPTH_RANGE;
    let (min_depth, max_depth, z_scale) = if near <= far {
        (near, far, 1.0)
    } else {
        (far, near, -1.0)
    };

    ViewportScissorPlan {
        viewport: Viewport {
            x,
            y: flip_y(y, h),
            width: w,
            height: h,
            min_depth: min_depth.clamp(0.0, 1.0),
            max_depth: max_depth.clamp(0.0, 1.0),
        },
        scissor,
        projection: ProjectionAdjust {
            x_scale,
            y_scale,
            x_offset,
            // Pixel rows grow downwards, NDC Y grows upwards.
            y_offset: -y_down_offset,
            z_scale,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderingMode;
    use crate::regs::GeScissor;

    fn direct() -> StateConfig {
        StateConfig {
            rendering_mode: RenderingMode::Direct,
            ..Default::default()
        }
    }

    #[test]
    fn default_viewport_fills_target() {
        let plan = plan_viewport_scissor(
            &HardwareDrawState::default(),
            &RenderTargetInfo::default(),
            &StateConfig::default(),
        );
        assert_eq!(
            plan.viewport,
            Viewport {
                x: 0.0,
                y: 0.0,
                width: 480.0,
                height: 272.0,
                min_depth: 0.0,
                max_depth: 1.0,
            }
        );
        assert_eq!(plan.scissor, None);
        assert!(plan.projection.is_identity());
    }

    #[test]
    fn upscaled_target_scales_scissor() {
        let state = HardwareDrawState {
            scissor: GeScissor {
                x1: 10,
                y1: 20,
                x2: 109,
                y2: 69,
            },
            ..Default::default()
        };
        let target = RenderTargetInfo {
            render_width: 960,
            render_height: 544,
            ..Default::default()
        };
        let plan = plan_viewport_scissor(&state, &target, &StateConfig::default());
        assert_eq!(
            plan.scissor,
            Some(ScissorRect {
                x: 20,
                y: 40,
                width: 200,
                height: 100,
            })
        );
        assert_eq!(plan.viewport.width, 960.0);
    }

    #[test]
    fn stereo_disables_scissor() {
        let state = HardwareDrawState {
            scissor: GeScissor {
                x1: 10,
                y1: 10,
                x2: 20,
                y2: 20,
            },
            ..Default::default()
        };
        let config = StateConfig {
            stereo_rendering: true,
            ..Default::default()
        };
        let plan = plan_viewport_scissor(&state, &RenderTargetInfo::default(), &config);
        assert_eq!(plan.scissor, None);
    }

    #[test]
    fn direct_mode_always_scissors() {
        let plan = plan_viewport_scissor(
            &HardwareDrawState::default(),
            &RenderTargetInfo::default(),
            &direct(),
        );
        assert_eq!(
            plan.scissor,
            Some(ScissorRect {
                x: 0,
                y: 0,
                width: 480,
                height: 272,
            })
        );
    }

    #[test]
    fn oversized_viewport_is_clipped_with_adjust() {
        let mut state = HardwareDrawState::default();
        // Twice as wide as the target, still centered on it.
        state.viewport.x_scale = 480.0;
        state.viewport.offset_x = 2048.0 - 240.0;
        let plan = plan_viewport_scissor(
            &state,
            &RenderTargetInfo::default(),
            &StateConfig::default(),
        );
        assert_eq!(plan.viewport.x, 0.0);
        assert_eq!(plan.viewport.width, 480.0);
        assert_eq!(plan.projection.x_scale, 2.0);
        assert_eq!(plan.projection.x_offset, 0.0);
        assert_eq!(plan.projection.y_scale, 1.0);
    }

    #[test]
    fn reversed_depth_range_is_swapped() {
        let mut state = HardwareDrawState::default();
        state.viewport.z_scale = -32767.5;
        let plan = plan_viewport_scissor(
            &state,
            &RenderTargetInfo::default(),
            &StateConfig::default(),
        );
        assert_eq!(plan.viewport.min_depth, 0.0);
        assert_eq!(plan.viewport.max_depth, 1.0);
        assert_eq!(plan.projection.z_scale, -1.0);
    }
}
