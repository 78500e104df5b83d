use std::fmt;

use crate::regs::GePrimitive;

impl fmt::Display for GePrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GePrimitive::Points => "points",
            GePrimitive::Lines => "lines",
            GePrimitive::LineStrip => "line_strip",
            GePrimitive::Triangles => "triangles",
            GePrimitive::TriangleStrip => "triangle_strip",
            GePrimitive::TriangleFan => "triangle_fan",
            GePrimitive::Rectangles => "rectangles",
        };
        f.write_str(s)
    }
}

/// How a GE primitive is drawn on the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimitiveExpansion {
    None,
    /// WebGPU has no triangle fans; the vertex stage emits them as a list.
    TriangleFan,
    /// Each pair of corner vertices becomes a quad of two triangles.
    Rectangles,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrimitiveTopologyTranslation {
    pub topology: wgpu::PrimitiveTopology,
    pub expansion: PrimitiveExpansion,
}

pub fn translate_primitive_topology(primitive: GePrimitive) -> PrimitiveTopologyTranslation {
    let (topology, expansion) = match primitive {
        GePrimitive::Points => (wgpu::PrimitiveTopology::PointList, PrimitiveExpansion::None),
        GePrimitive::Lines => (wgpu::PrimitiveTopology::LineList, PrimitiveExpansion::None),
        GePrimitive::LineStrip => (wgpu::PrimitiveTopology::LineStrip, PrimitiveExpansion::None),
        GePrimitive::Triangles => (
            wgpu::PrimitiveTopology::TriangleList,
            PrimitiveExpansion::None,
        ),
        GePrimitive::TriangleStrip => (
            wgpu::PrimitiveTopology::TriangleStrip,
            PrimitiveExpansion::None,
        ),
        GePrimitive::TriangleFan => (
            wgpu::PrimitiveTopology::TriangleList,
            PrimitiveExpansion::TriangleFan,
        ),
        GePrimitive::Rectangles => (
            wgpu::PrimitiveTopology::TriangleList,
            PrimitiveExpansion::Rectangles,
        ),
    };
    PrimitiveTopologyTranslation {
        topology,
        expansion,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fans_and_rectangles_need_expansion() {
        assert_eq!(
            translate_primitive_topology(GePrimitive::TriangleFan).expansion,
            PrimitiveExpansion::TriangleFan
        );
        let rects = translate_primitive_topology(GePrimitive::Rectangles);
        assert_eq!(rects.topology, wgpu::PrimitiveTopology::TriangleList);
        assert_eq!(rects.expansion, PrimitiveExpansion::Rectangles);
        assert_eq!(GePrimitive::LineStrip.to_string(), "line_strip");
    }
}
