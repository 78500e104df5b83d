//! Per-draw translation of GE fixed-function state into host state plans.
//!
//! Every resolver here is a pure function of the register snapshot and the host description.
//! Nothing in this module talks to the host or logs; lossy choices are returned as
//! [`Approximation`](crate::diag::Approximation)s on the plans.

pub mod blend;
pub mod blend_color;
pub mod depth_stencil;
pub mod logic_op;
pub mod raster;
pub mod replace_blend;
pub mod stencil;
pub mod tables;
pub mod topology;
pub mod viewport;

pub use blend::{resolve_blend, resolve_replace_blend, ResolvedBlendPlan};
pub use blend_color::{
    reconcile_fixed_colors, resolve_fixed_color, BlendSide, FixedColorFactor, FixedColorPlan,
};
pub use depth_stencil::{plan_depth_stencil, DepthStencilPlan, StencilPlan};
pub use logic_op::{emulate_logic_op, stencil_replace_blend, LogicOpEmulation};
pub use raster::{plan_raster, RasterPlan};
pub use replace_blend::{classify_replace_blend, ReplaceBlend};
pub use stencil::{
    alpha_channel_blend, replace_alpha_with_stencil, stencil_constant_alpha, stencil_write_mode,
    ReplaceAlpha, StencilConstantAlpha, StencilStep, StencilWriteMode,
};
pub use tables::{
    to_dual_source, translate_blend_equation, translate_color_mask, translate_compare,
    translate_cull_face, translate_dst_blend, translate_logic_op, translate_src_blend,
    translate_stencil_op, ColorMask, LogicOperation,
};
pub use topology::{translate_primitive_topology, PrimitiveExpansion, PrimitiveTopologyTranslation};
pub use viewport::{
    plan_viewport_scissor, ProjectionAdjust, RenderTargetInfo, ScissorRect, Viewport,
    ViewportScissorPlan,
};
