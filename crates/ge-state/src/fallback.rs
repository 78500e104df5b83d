//! Budgeted framebuffer copies for blends the fixed-function unit can't express.
//!
//! Each shader-blended draw needs the current framebuffer color bound as a texture, which means a
//! copy on hosts without framebuffer fetch. Copies are expensive, so they are counted per frame
//! (keyed by the display flip counter) and refused past a hard limit.

use thiserror::Error;
use tracing::warn;

use crate::config::HostCaps;

/// Copies per frame above which the previous frame is reported as heavy.
pub const FRAME_COPY_WARN_THRESHOLD: u32 = 24;
/// Copies per frame after which requests are refused until the next flip or reset.
pub const FRAME_COPY_LIMIT: u32 = 48;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ShaderBlendError {
    #[error("framebuffer copy budget exhausted ({copies} copies this frame, limit {limit})")]
    CopyBudgetExhausted { copies: u32, limit: u32 },
}

#[derive(Debug, Default)]
pub struct ShaderBlendFallback {
    last_flip: Option<u64>,
    copies_this_frame: u32,
    /// A copy was granted and the late stage still has to bind it.
    needs_bind: bool,
    /// The framebuffer color is currently bound as a texture.
    bound: bool,
    /// Finished frames that went over the warning threshold.
    heavy_frames: u32,
    warned_heavy_frame: bool,
    warned_exhausted: bool,
}

impl ShaderBlendFallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for the framebuffer color to be made readable by the next draw.
    pub fn request_copy(&mut self, flip: u64, caps: HostCaps) -> Result<(), ShaderBlendError> {
        if caps.contains(HostCaps::FRAMEBUFFER_FETCH) {
            // The shader reads the framebuffer directly.
            return Ok(());
        }

        if self.last_flip != Some(flip) {
            self.end_frame();
            self.last_flip = Some(flip);
        }

        self.copies_this_frame += 1;
        if self.copies_this_frame > FRAME_COPY_LIMIT {
            if !self.warned_exhausted {
                self.warned_exhausted = true;
                warn!(
                    copies = self.copies_this_frame,
                    limit = FRAME_COPY_LIMIT,
                    "too many framebuffer copies this frame, falling back to fixed-function blending"
                );
            }
            self.needs_bind = false;
            return Err(ShaderBlendError::CopyBudgetExhausted {
                copies: self.copies_this_frame,
                limit: FRAME_COPY_LIMIT,
            });
        }

        self.needs_bind = true;
        Ok(())
    }

    /// Drop any pending or active binding. Returns whether the host must unbind the texture.
    pub fn release(&mut self) -> bool {
        self.needs_bind = false;
        std::mem::take(&mut self.bound)
    }

    /// Release the binding and clear the per-frame budget.
    pub fn reset(&mut self) -> bool {
        self.end_frame();
        self.last_flip = None;
        self.release()
    }

    /// Close out the current frame's budget, noting it if it copied heavily.
    fn end_frame(&mut self) {
        if self.copies_this_frame > FRAME_COPY_WARN_THRESHOLD {
            self.heavy_frames += 1;
            if !self.warned_heavy_frame {
                self.warned_heavy_frame = true;
                warn!(
                    copies = self.copies_this_frame,
                    threshold = FRAME_COPY_WARN_THRESHOLD,
                    "heavy framebuffer copying for shader blending in previous frame"
                );
            }
        }
        self.copies_this_frame = 0;
    }

    /// Consume the pending late bind, marking the texture bound.
    pub fn take_pending_bind(&mut self) -> bool {
        if !self.needs_bind {
            return false;
        }
        self.needs_bind = false;
        self.bound = true;
        true
    }

    pub fn needs_bind(&self) -> bool {
        self.needs_bind
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn copies_this_frame(&self) -> u32 {
        self.copies_this_frame
    }

    pub fn heavy_frames(&self) -> u32 {
        self.heavy_frames
    }
}
