//! Glyph atlas generation and text layout for the MSDF text program.
//!
//! Glyphs are rasterized once with `fontdue` at a base pixel size, turned
//! into distance fields and shelf-packed into a [`FontAtlas`]. The same field
//! is written to all three channels, so the median in the shader is exact.
//! [`push_text`] then emits one quad per glyph into a textured frame.

mod packer;
mod sdf;

use std::collections::HashMap;

use rack_proto::{FrameBuilder, Rgba8, TexturedVertex};
use thiserror::Error;

use crate::render::{AtlasError, FontAtlas, msdf::ATLAS_SIZE};

pub use packer::{GLYPH_PADDING, ShelfPacker};
pub use sdf::distance_field;

/// Paths probed by [`load_system_font`].
pub const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
];

#[derive(Debug, Error)]
pub enum TextError {
    #[error("font load error: {0}")]
    Font(&'static str),
    #[error(transparent)]
    Atlas(#[from] AtlasError),
}

/// Reads the first font found in [`SYSTEM_FONT_PATHS`].
pub fn load_system_font() -> Option<Vec<u8>> {
    SYSTEM_FONT_PATHS.iter().find_map(|p| std::fs::read(p).ok())
}

#[derive(Debug, Clone, Copy)]
pub struct GlyphAtlasConfig {
    /// Pixel size glyphs are rasterized at.
    pub base_px: f32,
    /// Distance field reach in texels.
    pub spread: u32,
    pub atlas_size: u32,
}

impl Default for GlyphAtlasConfig {
    fn default() -> Self {
        Self {
            base_px: 20.0,
            spread: 3,
            atlas_size: ATLAS_SIZE,
        }
    }
}

/// One packed glyph. Offsets and sizes are in base pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub uv_min: (u16, u16),
    pub uv_max: (u16, u16),
    /// Top-left of the field relative to the pen on the baseline (y down).
    pub offset: [f32; 2],
    pub size: [f32; 2],
    pub advance: f32,
}

impl Glyph {
    #[inline]
    fn is_blank(&self) -> bool {
        self.size[0] <= 0.0 || self.size[1] <= 0.0
    }
}

/// Distance-field atlas plus the metrics to lay text out against it.
#[derive(Debug, Clone)]
pub struct GlyphAtlas {
    atlas: FontAtlas,
    glyphs: HashMap<char, Glyph>,
    base_px: f32,
    ascent: f32,
    line_height: f32,
}

impl GlyphAtlas {
    /// Builds an atlas of printable ASCII from TrueType/OpenType bytes.
    pub fn from_font_bytes(bytes: &[u8], config: GlyphAtlasConfig) -> Result<Self, TextError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(TextError::Font)?;
        Self::build(&font, (' '..='~').chain(['\u{fffd}']), config)
    }

    /// Builds an atlas for `chars`. Glyphs that no longer fit are left out
    /// with a warning.
    pub fn build(
        font: &fontdue::Font,
        chars: impl IntoIterator<Item = char>,
        config: GlyphAtlasConfig,
    ) -> Result<Self, TextError> {
        let mut atlas = FontAtlas::blank(config.atlas_size)?;
        let mut packer = ShelfPacker::new(config.atlas_size);
        let mut glyphs = HashMap::new();
        let px = config.base_px;
        let spread = config.spread.max(1);

        for ch in chars {
            if font.lookup_glyph_index(ch) == 0 && ch != ' ' {
                continue;
            }
            let (metrics, coverage) = font.rasterize(ch, px);
            let mut glyph = Glyph {
                uv_min: (0, 0),
                uv_max: (0, 0),
                offset: [0.0; 2],
                size: [0.0; 2],
                advance: metrics.advance_width,
            };

            if metrics.width > 0 && metrics.height > 0 {
                let (field, fw, fh) =
                    distance_field(&coverage, metrics.width as u32, metrics.height as u32, spread);
                let Some((x, y)) = packer.place(fw, fh) else {
                    log::warn!("glyph atlas is full ({0}x{0}); '{ch}' left out", config.atlas_size);
                    continue;
                };
                atlas.blit_field(x, y, fw, fh, &field);

                let s = spread as f32;
                glyph.uv_min = (x as u16, y as u16);
                glyph.uv_max = ((x + fw - 1) as u16, (y + fh - 1) as u16);
                glyph.offset = [
                    metrics.xmin as f32 - s,
                    -(metrics.ymin as f32 + metrics.height as f32) - s,
                ];
                glyph.size = [fw as f32, fh as f32];
            }
            glyphs.insert(ch, glyph);
        }

        let (ascent, line_height) = match font.horizontal_line_metrics(px) {
            Some(m) => (m.ascent, m.new_line_size),
            None => (px * 0.8, px * 1.2),
        };
        log::debug!("glyph atlas built: {} glyphs at {px}px", glyphs.len());

        Ok(Self {
            atlas,
            glyphs,
            base_px: px,
            ascent,
            line_height,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        atlas: FontAtlas,
        base_px: f32,
        ascent: f32,
        line_height: f32,
        glyphs: HashMap<char, Glyph>,
    ) -> Self {
        Self {
            atlas,
            glyphs,
            base_px,
            ascent,
            line_height,
        }
    }

    #[inline]
    pub fn atlas(&self) -> &FontAtlas {
        &self.atlas
    }

    #[inline]
    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch)
    }

    #[inline]
    pub fn line_height(&self, px: f32) -> f32 {
        self.line_height * px / self.base_px
    }

    /// Width and height of `text` at `px`.
    pub fn measure(&self, text: &str, px: f32) -> [f32; 2] {
        let k = px / self.base_px;
        let mut width: f32 = 0.0;
        let mut lines = 1;
        let mut pen = 0.0;
        for ch in text.chars() {
            if ch == '\n' {
                width = width.max(pen);
                pen = 0.0;
                lines += 1;
                continue;
            }
            if let Some(g) = self.lookup(ch) {
                pen += g.advance * k;
            }
        }
        [width.max(pen), lines as f32 * self.line_height(px)]
    }

    fn lookup(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch).or_else(|| self.glyphs.get(&'\u{fffd}'))
    }
}

/// Lays `text` out with its top-left corner at `origin` and appends one glyph
/// quad per visible character. Returns the measured size.
pub fn push_text(
    frame: &mut FrameBuilder<TexturedVertex>,
    glyphs: &GlyphAtlas,
    origin: [f32; 2],
    px: f32,
    text: &str,
    color: Rgba8,
) -> [f32; 2] {
    let k = px / glyphs.base_px;
    let mut pen = origin[0];
    let mut baseline = origin[1] + glyphs.ascent * k;

    for ch in text.chars() {
        if ch == '\n' {
            pen = origin[0];
            baseline += glyphs.line_height(px);
            continue;
        }
        let Some(g) = glyphs.lookup(ch) else { continue };
        if !g.is_blank() {
            let min = [pen + g.offset[0] * k, baseline + g.offset[1] * k];
            let max = [min[0] + g.size[0] * k, min[1] + g.size[1] * k];
            frame.push_glyph(min, max, g.uv_min, g.uv_max, color);
        }
        pen += g.advance * k;
    }

    glyphs.measure(text, px)
}

#[cfg(test)]
mod tests {
    use rack_proto::{DrawStream, ProgramId, Topology};

    use super::*;

    fn fixture() -> GlyphAtlas {
        let mut map = HashMap::new();
        map.insert(
            'a',
            Glyph {
                uv_min: (1, 1),
                uv_max: (11, 13),
                offset: [-1.0, -10.0],
                size: [10.0, 12.0],
                advance: 8.0,
            },
        );
        map.insert(
            ' ',
            Glyph {
                uv_min: (0, 0),
                uv_max: (0, 0),
                offset: [0.0; 2],
                size: [0.0; 2],
                advance: 4.0,
            },
        );
        GlyphAtlas::from_parts(FontAtlas::blank(64).unwrap(), 16.0, 12.0, 20.0, map)
    }

    #[test]
    fn quads_follow_the_pen() {
        let g = fixture();
        let mut frame = FrameBuilder::<TexturedVertex>::new();
        let size = push_text(&mut frame, &g, [100.0, 50.0], 32.0, "a a", Rgba8::WHITE);
        // scale 2: advances 16 + 8 + 16
        assert_eq!(size, [40.0, 40.0]);

        let out = frame.finish();
        // two glyphs, spaces emit nothing
        assert_eq!(out.vertices.len(), 12);
        let first = out.vertices[0];
        // pen 100 + (-1 * 2), baseline 50 + 24 + (-10 * 2)
        assert_eq!(first.pos, [98.0, 54.0]);
        assert_eq!(first.uv.unpack(), (1, 1));
        let second = out.vertices[6];
        assert_eq!(second.pos, [98.0 + 24.0, 54.0]);

        let draws = DrawStream::new(out.draw_bytes, out.draw_count).unwrap();
        assert_eq!(draws.len(), 1);
        let cmd = draws.get(0).unwrap().unwrap();
        assert_eq!(cmd.program, ProgramId::MSDF_TEXT);
        assert_eq!(cmd.topology, Topology::TriangleList);
    }

    #[test]
    fn newline_resets_pen_and_drops_a_line() {
        let g = fixture();
        let mut frame = FrameBuilder::<TexturedVertex>::new();
        let size = push_text(&mut frame, &g, [0.0, 0.0], 16.0, "aa\na", Rgba8::WHITE);
        assert_eq!(size, [16.0, 40.0]);
        let out = frame.finish();
        assert_eq!(out.vertices[12].pos, [-1.0, 12.0 + 20.0 - 10.0]);
    }

    #[test]
    fn unknown_chars_are_skipped_without_fallback() {
        let g = fixture();
        assert_eq!(g.measure("z", 16.0), [0.0, 20.0]);
    }

    #[test]
    fn real_font_builds_when_available() {
        let Some(bytes) = load_system_font() else { return };
        let glyphs = GlyphAtlas::from_font_bytes(&bytes, GlyphAtlasConfig::default()).unwrap();
        assert_eq!(glyphs.atlas().size(), ATLAS_SIZE);
        let a = glyphs.glyph('A').unwrap();
        assert!(a.advance > 0.0);
        assert!(a.uv_max.0 > a.uv_min.0 && a.uv_max.1 > a.uv_min.1);
        assert!(glyphs.glyph(' ').is_some_and(Glyph::is_blank));
    }
}
