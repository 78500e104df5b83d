//! GE register file and the per-draw `HardwareDrawState` snapshot decoded from it.
//!
//! The enums here are "semantic" views of the raw command words so the rest of the crate never
//! has to deal with bit positions. Decoding happens once per draw; everything downstream reads
//! the snapshot.

use tracing::debug;

/// GE command numbers for the registers the state translator reads.
pub mod cmd {
    pub const VERTEX_TYPE: u8 = 0x12;
    pub const CULL_FACE_ENABLE: u8 = 0x1D;
    pub const TEXTURE_MAP_ENABLE: u8 = 0x1E;
    pub const DITHER_ENABLE: u8 = 0x20;
    pub const ALPHA_BLEND_ENABLE: u8 = 0x21;
    pub const ALPHA_TEST_ENABLE: u8 = 0x22;
    pub const Z_TEST_ENABLE: u8 = 0x23;
    pub const STENCIL_TEST_ENABLE: u8 = 0x24;
    pub const COLOR_TEST_ENABLE: u8 = 0x27;
    pub const LOGIC_OP_ENABLE: u8 = 0x28;

    pub const VIEWPORT_X_SCALE: u8 = 0x42;
    pub const VIEWPORT_Y_SCALE: u8 = 0x43;
    pub const VIEWPORT_Z_SCALE: u8 = 0x44;
    pub const VIEWPORT_X_CENTER: u8 = 0x45;
    pub const VIEWPORT_Y_CENTER: u8 = 0x46;
    pub const VIEWPORT_Z_CENTER: u8 = 0x47;
    pub const OFFSET_X: u8 = 0x4C;
    pub const OFFSET_Y: u8 = 0x4D;

    pub const CULL: u8 = 0x9B;

    pub const FRAMEBUF_PIXEL_FORMAT: u8 = 0xD2;
    pub const CLEAR_MODE: u8 = 0xD3;
    pub const SCISSOR1: u8 = 0xD4;
    pub const SCISSOR2: u8 = 0xD5;
    pub const STENCIL_TEST: u8 = 0xDC;
    pub const STENCIL_OP: u8 = 0xDD;
    pub const Z_TEST: u8 = 0xDE;
    pub const BLEND_MODE: u8 = 0xDF;
    pub const BLEND_FIXED_A: u8 = 0xE0;
    pub const BLEND_FIXED_B: u8 = 0xE1;
    pub const LOGIC_OP: u8 = 0xE6;
    pub const Z_WRITE_DISABLE: u8 = 0xE7;
    pub const MASK_RGB: u8 = 0xE8;
    pub const MASK_ALPHA: u8 = 0xE9;
}

/// Source blend factor selector (`A` half of the blend register).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeSrcBlend {
    DstColor,
    InvDstColor,
    SrcAlpha,
    InvSrcAlpha,
    DstAlpha,
    InvDstAlpha,
    DoubleSrcAlpha,
    DoubleInvSrcAlpha,
    DoubleDstAlpha,
    DoubleInvDstAlpha,
    FixA,
}

impl GeSrcBlend {
    pub const ALL: [GeSrcBlend; 11] = [
        GeSrcBlend::DstColor,
        GeSrcBlend::InvDstColor,
        GeSrcBlend::SrcAlpha,
        GeSrcBlend::InvSrcAlpha,
        GeSrcBlend::DstAlpha,
        GeSrcBlend::InvDstAlpha,
        GeSrcBlend::DoubleSrcAlpha,
        GeSrcBlend::DoubleInvSrcAlpha,
        GeSrcBlend::DoubleDstAlpha,
        GeSrcBlend::DoubleInvDstAlpha,
        GeSrcBlend::FixA,
    ];

    /// Selectors 11..=15 behave like the fixed color on hardware.
    pub fn from_raw(value: u32) -> Self {
        Self::ALL[(value as usize).min(10)]
    }

    /// Whether the factor never reads the fragment's alpha output.
    pub fn ignores_src_alpha(self) -> bool {
        !matches!(
            self,
            GeSrcBlend::SrcAlpha
                | GeSrcBlend::InvSrcAlpha
                | GeSrcBlend::DoubleSrcAlpha
                | GeSrcBlend::DoubleInvSrcAlpha
        )
    }
}

/// Destination blend factor selector (`B` half of the blend register).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeDstBlend {
    SrcColor,
    InvSrcColor,
    SrcAlpha,
    InvSrcAlpha,
    DstAlpha,
    InvDstAlpha,
    DoubleSrcAlpha,
    DoubleInvSrcAlpha,
    DoubleDstAlpha,
    DoubleInvDstAlpha,
    FixB,
}

impl GeDstBlend {
    pub const ALL: [GeDstBlend; 11] = [
        GeDstBlend::SrcColor,
        GeDstBlend::InvSrcColor,
        GeDstBlend::SrcAlpha,
        GeDstBlend::InvSrcAlpha,
        GeDstBlend::DstAlpha,
        GeDstBlend::InvDstAlpha,
        GeDstBlend::DoubleSrcAlpha,
        GeDstBlend::DoubleInvSrcAlpha,
        GeDstBlend::DoubleDstAlpha,
        GeDstBlend::DoubleInvDstAlpha,
        GeDstBlend::FixB,
    ];

    /// Selectors 11..=15 behave like the fixed color on hardware.
    pub fn from_raw(value: u32) -> Self {
        Self::ALL[(value as usize).min(10)]
    }

    pub fn ignores_src_alpha(self) -> bool {
        !matches!(
            self,
            GeDstBlend::SrcAlpha
                | GeDstBlend::InvSrcAlpha
                | GeDstBlend::DoubleSrcAlpha
                | GeDstBlend::DoubleInvSrcAlpha
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeBlendMode {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
    AbsDiff,
}

impl GeBlendMode {
    pub const ALL: [GeBlendMode; 6] = [
        GeBlendMode::Add,
        GeBlendMode::Subtract,
        GeBlendMode::ReverseSubtract,
        GeBlendMode::Min,
        GeBlendMode::Max,
        GeBlendMode::AbsDiff,
    ];

    pub fn from_raw(value: u32) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }
}

/// Comparison function shared by the depth and stencil tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeComparison {
    Never,
    Always,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl GeComparison {
    pub const ALL: [GeComparison; 8] = [
        GeComparison::Never,
        GeComparison::Always,
        GeComparison::Equal,
        GeComparison::NotEqual,
        GeComparison::Less,
        GeComparison::LessEqual,
        GeComparison::Greater,
        GeComparison::GreaterEqual,
    ];

    pub fn from_raw(value: u32) -> Self {
        Self::ALL[(value & 7) as usize]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeStencilOp {
    Keep,
    Zero,
    Replace,
    Invert,
    Increment,
    Decrement,
    Reserved6,
    Reserved7,
}

impl GeStencilOp {
    pub const ALL: [GeStencilOp; 8] = [
        GeStencilOp::Keep,
        GeStencilOp::Zero,
        GeStencilOp::Replace,
        GeStencilOp::Invert,
        GeStencilOp::Increment,
        GeStencilOp::Decrement,
        GeStencilOp::Reserved6,
        GeStencilOp::Reserved7,
    ];

    pub fn from_raw(value: u32) -> Self {
        Self::ALL[(value & 7) as usize]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeLogicOp {
    Clear,
    And,
    AndReverse,
    Copy,
    AndInverted,
    Noop,
    Xor,
    Or,
    Nor,
    Equiv,
    Inverted,
    OrReverse,
    CopyInverted,
    OrInverted,
    Nand,
    Set,
}

impl GeLogicOp {
    pub const ALL: [GeLogicOp; 16] = [
        GeLogicOp::Clear,
        GeLogicOp::And,
        GeLogicOp::AndReverse,
        GeLogicOp::Copy,
        GeLogicOp::AndInverted,
        GeLogicOp::Noop,
        GeLogicOp::Xor,
        GeLogicOp::Or,
        GeLogicOp::Nor,
        GeLogicOp::Equiv,
        GeLogicOp::Inverted,
        GeLogicOp::OrReverse,
        GeLogicOp::CopyInverted,
        GeLogicOp::OrInverted,
        GeLogicOp::Nand,
        GeLogicOp::Set,
    ];

    pub fn from_raw(value: u32) -> Self {
        Self::ALL[(value & 0xF) as usize]
    }
}

/// Which winding the GE culls when culling is enabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CullWinding {
    Cw,
    Ccw,
}

impl CullWinding {
    pub fn from_raw(value: u32) -> Self {
        if value & 1 == 0 {
            CullWinding::Cw
        } else {
            CullWinding::Ccw
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            CullWinding::Cw => CullWinding::Ccw,
            CullWinding::Ccw => CullWinding::Cw,
        }
    }
}

/// Framebuffer pixel format. Determines how many stencil bits live in the alpha channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeBufferFormat {
    Rgb565,
    Rgba5551,
    Rgba4444,
    Rgba8888,
}

impl GeBufferFormat {
    pub fn from_raw(value: u32) -> Self {
        match value & 3 {
            0 => GeBufferFormat::Rgb565,
            1 => GeBufferFormat::Rgba5551,
            2 => GeBufferFormat::Rgba4444,
            _ => GeBufferFormat::Rgba8888,
        }
    }

    pub fn has_alpha(self) -> bool {
        self != GeBufferFormat::Rgb565
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GePrimitive {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
    Rectangles,
}

impl GePrimitive {
    pub fn from_raw(value: u32) -> Option<Self> {
        Some(match value {
            0 => GePrimitive::Points,
            1 => GePrimitive::Lines,
            2 => GePrimitive::LineStrip,
            3 => GePrimitive::Triangles,
            4 => GePrimitive::TriangleStrip,
            5 => GePrimitive::TriangleFan,
            6 => GePrimitive::Rectangles,
            _ => return None,
        })
    }
}

/// Inclusive scissor rectangle in GE pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeScissor {
    pub x1: u16,
    pub y1: u16,
    pub x2: u16,
    pub y2: u16,
}

impl Default for GeScissor {
    fn default() -> Self {
        Self {
            x1: 0,
            y1: 0,
            x2: 479,
            y2: 271,
        }
    }
}

/// Viewport transform registers, already expanded from float24.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeViewport {
    pub x_scale: f32,
    pub y_scale: f32,
    pub z_scale: f32,
    pub x_center: f32,
    pub y_center: f32,
    pub z_center: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Default for GeViewport {
    // The common 480x272 setup centered at 2048,2048.
    fn default() -> Self {
        Self {
            x_scale: 240.0,
            y_scale: -136.0,
            z_scale: 32767.5,
            x_center: 2048.0,
            y_center: 2048.0,
            z_center: 32767.5,
            offset_x: 1808.0,
            offset_y: 1912.0,
        }
    }
}

/// Read-only snapshot of the register state for a single draw call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HardwareDrawState {
    pub alpha_blend_enable: bool,
    pub blend_src: GeSrcBlend,
    pub blend_dst: GeDstBlend,
    pub blend_eq: GeBlendMode,
    /// 24-bit `0xBBGGRR` fixed colors.
    pub fix_a: u32,
    pub fix_b: u32,

    pub stencil_test_enable: bool,
    pub stencil_func: GeComparison,
    pub stencil_ref: u8,
    pub stencil_mask: u8,
    pub stencil_fail: GeStencilOp,
    pub stencil_zfail: GeStencilOp,
    pub stencil_zpass: GeStencilOp,

    pub depth_test_enable: bool,
    pub depth_func: GeComparison,
    pub depth_write_enable: bool,

    /// Per-bit "do not write" masks: 24 bits of RGB, 8 bits of alpha/stencil.
    pub mask_rgb: u32,
    pub mask_alpha: u8,

    pub cull_enable: bool,
    pub cull_winding: CullWinding,

    pub logic_op_enable: bool,
    pub logic_op: GeLogicOp,

    pub through_mode: bool,
    pub clear_mode: bool,
    pub clear_color_mask: bool,
    pub clear_alpha_mask: bool,
    pub clear_depth_mask: bool,

    pub dither_enable: bool,
    pub texture_map_enable: bool,
    pub alpha_test_enable: bool,
    pub color_test_enable: bool,

    pub framebuffer_format: GeBufferFormat,
    pub scissor: GeScissor,
    pub viewport: GeViewport,
}

impl Default for HardwareDrawState {
    fn default() -> Self {
        Self {
            alpha_blend_enable: false,
            blend_src: GeSrcBlend::SrcAlpha,
            blend_dst: GeDstBlend::InvSrcAlpha,
            blend_eq: GeBlendMode::Add,
            fix_a: 0,
            fix_b: 0,
            stencil_test_enable: false,
            stencil_func: GeComparison::Always,
            stencil_ref: 0,
            stencil_mask: 0xFF,
            stencil_fail: GeStencilOp::Keep,
            stencil_zfail: GeStencilOp::Keep,
            stencil_zpass: GeStencilOp::Keep,
            depth_test_enable: false,
            depth_func: GeComparison::Always,
            depth_write_enable: true,
            mask_rgb: 0,
            mask_alpha: 0,
            cull_enable: false,
            cull_winding: CullWinding::Cw,
            logic_op_enable: false,
            logic_op: GeLogicOp::Copy,
            through_mode: false,
            clear_mode: false,
            clear_color_mask: false,
            clear_alpha_mask: false,
            clear_depth_mask: false,
            dither_enable: false,
            texture_map_enable: false,
            alpha_test_enable: false,
            color_test_enable: false,
            framebuffer_format: GeBufferFormat::Rgba8888,
            scissor: GeScissor::default(),
            viewport: GeViewport::default(),
        }
    }
}

/// Raw GE register file: the low 24 bits of the last word written for each command.
#[derive(Clone, Debug)]
pub struct GeRegisterFile {
    words: [u32; 256],
}

impl Default for GeRegisterFile {
    fn default() -> Self {
        Self { words: [0; 256] }
    }
}

impl GeRegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a full command word (`cmd << 24 | data`).
    pub fn write_command(&mut self, word: u32) {
        let cmd = (word >> 24) as u8;
        self.write(cmd, word & 0x00FF_FFFF);
    }

    pub fn write(&mut self, cmd: u8, data: u32) {
        self.words[cmd as usize] = data & 0x00FF_FFFF;
    }

    pub fn read(&self, cmd: u8) -> u32 {
        self.words[cmd as usize]
    }

    fn flag(&self, cmd: u8) -> bool {
        self.read(cmd) & 1 != 0
    }

    fn float24(&self, cmd: u8) -> f32 {
        f32::from_bits(self.read(cmd) << 8)
    }
}

impl HardwareDrawState {
    pub fn from_registers(regs: &GeRegisterFile) -> Self {
        let blend = regs.read(cmd::BLEND_MODE);
        let blend_eq_raw = (blend >> 8) & 0x7;
        let blend_eq = match GeBlendMode::from_raw(blend_eq_raw) {
            Some(eq) => eq,
            None => {
                debug!(value = blend_eq_raw, "unknown GE blend equation");
                GeBlendMode::Add
            }
        };

        let stencil_test = regs.read(cmd::STENCIL_TEST);
        let stencil_op = regs.read(cmd::STENCIL_OP);
        let clear = regs.read(cmd::CLEAR_MODE);
        let scissor1 = regs.read(cmd::SCISSOR1);
        let scissor2 = regs.read(cmd::SCISSOR2);

        Self {
            alpha_blend_enable: regs.flag(cmd::ALPHA_BLEND_ENABLE),
            blend_src: GeSrcBlend::from_raw(blend & 0xF),
            blend_dst: GeDstBlend::from_raw((blend >> 4) & 0xF),
            blend_eq,
            fix_a: regs.read(cmd::BLEND_FIXED_A),
            fix_b: regs.read(cmd::BLEND_FIXED_B),

            stencil_test_enable: regs.flag(cmd::STENCIL_TEST_ENABLE),
            stencil_func: GeComparison::from_raw(stencil_test),
            stencil_ref: ((stencil_test >> 8) & 0xFF) as u8,
            stencil_mask: ((stencil_test >> 16) & 0xFF) as u8,
            stencil_fail: GeStencilOp::from_raw(stencil_op),
            stencil_zfail: GeStencilOp::from_raw(stencil_op >> 8),
            stencil_zpass: GeStencilOp::from_raw(stencil_op >> 16),

            depth_test_enable: regs.flag(cmd::Z_TEST_ENABLE),
            depth_func: GeComparison::from_raw(regs.read(cmd::Z_TEST)),
            depth_write_enable: !regs.flag(cmd::Z_WRITE_DISABLE),

            mask_rgb: regs.read(cmd::MASK_RGB),
            mask_alpha: (regs.read(cmd::MASK_ALPHA) & 0xFF) as u8,

            cull_enable: regs.flag(cmd::CULL_FACE_ENABLE),
            cull_winding: CullWinding::from_raw(regs.read(cmd::CULL)),

            logic_op_enable: regs.flag(cmd::LOGIC_OP_ENABLE),
            logic_op: GeLogicOp::from_raw(regs.read(cmd::LOGIC_OP)),

            through_mode: regs.read(cmd::VERTEX_TYPE) & (1 << 23) != 0,
            clear_mode: clear & 1 != 0,
            clear_color_mask: clear & 0x100 != 0,
            clear_alpha_mask: clear & 0x200 != 0,
            clear_depth_mask: clear & 0x400 != 0,

            dither_enable: regs.flag(cmd::DITHER_ENABLE),
            texture_map_enable: regs.flag(cmd::TEXTURE_MAP_ENABLE),
            alpha_test_enable: regs.flag(cmd::ALPHA_TEST_ENABLE),
            color_test_enable: regs.flag(cmd::COLOR_TEST_ENABLE),

            framebuffer_format: GeBufferFormat::from_raw(regs.read(cmd::FRAMEBUF_PIXEL_FORMAT)),
            scissor: GeScissor {
                x1: (scissor1 & 0x3FF) as u16,
                y1: ((scissor1 >> 10) & 0x3FF) as u16,
                x2: (scissor2 & 0x3FF) as u16,
                y2: ((scissor2 >> 10) & 0x3FF) as u16,
            },
            viewport: GeViewport {
                x_scale: regs.float24(cmd::VIEWPORT_X_SCALE),
                y_scale: regs.float24(cmd::VIEWPORT_Y_SCALE),
                z_scale: regs.float24(cmd::VIEWPORT_Z_SCALE),
                x_center: regs.float24(cmd::VIEWPORT_X_CENTER),
                y_center: regs.float24(cmd::VIEWPORT_Y_CENTER),
                z_center: regs.float24(cmd::VIEWPORT_Z_CENTER),
                // 12.4 fixed point.
                offset_x: (regs.read(cmd::OFFSET_X) & 0xFFFF) as f32 / 16.0,
                offset_y: (regs.read(cmd::OFFSET_Y) & 0xFFFF) as f32 / 16.0,
            },
        }
    }

    /// Per-byte view of the RGB write mask, matching the host's per-channel granularity.
    pub fn mask_rgb_bytes(&self) -> [u8; 3] {
        [
            (self.mask_rgb & 0xFF) as u8,
            ((self.mask_rgb >> 8) & 0xFF) as u8,
            ((self.mask_rgb >> 16) & 0xFF) as u8,
        ]
    }
}
