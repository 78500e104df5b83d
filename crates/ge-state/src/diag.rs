//! Rate-limited reporting of translation approximations.
//!
//! Resolvers never log directly; they attach [`Approximation`]s to the plans they return so the
//! plans stay pure. The engine forwards them here, and each distinct condition is logged once per
//! [`Diagnostics`] instance (one per emulator run).

use hashbrown::HashSet;
use tracing::{debug, warn};

use crate::regs::{GeComparison, GeDstBlend, GeLogicOp, GeSrcBlend};
use crate::state::{ReplaceBlend, StencilWriteMode};

/// A place where the host state only approximates the GE semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Approximation {
    /// A fixed blend color was rounded to ZERO/ONE.
    FixedColorRounded { fix: u32 },
    /// Both fixed colors needed the single host blend constant.
    FixedColorConflict {
        fix_a: u32,
        fix_b: u32,
        src: GeSrcBlend,
        dst: GeDstBlend,
    },
    /// Stencil must reach alpha but the blend reads source alpha and dual-source is missing.
    StencilAlphaWithoutDualSource,
    /// Stencil value written through a constant-alpha blend instead of the shader.
    StencilAlphaViaBlend { mode: StencilWriteMode },
    /// Logic op with no exact blend substitute.
    LogicOpUnsupported { op: GeLogicOp },
    /// Blend needed a framebuffer copy but shader blending is off; fixed-function used instead.
    ShaderBlendUnavailable { replace: ReplaceBlend },
    /// RGB write mask with bits other than 0x00/0xFF in a channel.
    PartialColorMask { r: u8, g: u8, b: u8 },
    /// Alpha/stencil write mask with bits other than 0x00/0xFF.
    PartialAlphaMask { bits: u8 },
    /// Through-mode draw whose depth test depends on exact depth equality.
    DepthEqualityInThroughMode { func: GeComparison },
}

impl Approximation {
    /// Identity used for once-only reporting.
    fn key(&self) -> (&'static str, u32) {
        match *self {
            Approximation::FixedColorRounded { .. } => ("fixed_color_rounded", 0),
            Approximation::FixedColorConflict { .. } => ("fixed_color_conflict", 0),
            Approximation::StencilAlphaWithoutDualSource => ("stencil_alpha_dual_source", 0),
            Approximation::StencilAlphaViaBlend { .. } => ("stencil_alpha_via_blend", 0),
            Approximation::LogicOpUnsupported { op } => ("logic_op", op as u32),
            Approximation::ShaderBlendUnavailable { .. } => ("shader_blend_unavailable", 0),
            Approximation::PartialColorMask { .. } => ("partial_rgb_mask", 0),
            Approximation::PartialAlphaMask { .. } => ("partial_alpha_mask", 0),
            Approximation::DepthEqualityInThroughMode { .. } => ("through_depth_equality", 0),
        }
    }

    /// Whether the condition is visible enough to deserve a warning rather than a debug note.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Approximation::FixedColorConflict { .. }
                | Approximation::StencilAlphaWithoutDualSource
                | Approximation::LogicOpUnsupported { .. }
                | Approximation::PartialColorMask { .. }
                | Approximation::PartialAlphaMask { .. }
        )
    }
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    reported: HashSet<(&'static str, u32)>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `approx` unless the same condition was already reported. Returns whether it logged.
    pub fn report(&mut self, approx: &Approximation) -> bool {
        if !self.reported.insert(approx.key()) {
            return false;
        }
        if approx.is_warning() {
            warn!(?approx, "GE state only approximated on host");
        } else {
            debug!(?approx, "GE state only approximated on host");
        }
        true
    }

    pub fn report_all<'a>(&mut self, approxs: impl IntoIterator<Item = &'a Approximation>) {
        for approx in approxs {
            self.report(approx);
        }
    }

    /// Number of distinct conditions reported so far.
    pub fn reported_count(&self) -> usize {
        self.reported.len()
    }
}
