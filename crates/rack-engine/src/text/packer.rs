/// Gap kept between packed rectangles and around the atlas border.
pub const GLYPH_PADDING: u32 = 1;

/// Row-based rectangle packer: fills a shelf left to right, then opens a new
/// shelf below the tallest entry of the current one.
#[derive(Debug, Clone)]
pub struct ShelfPacker {
    size: u32,
    cursor_x: u32,
    cursor_y: u32,
    row_height: u32,
    full: bool,
}

impl ShelfPacker {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            cursor_x: GLYPH_PADDING,
            cursor_y: GLYPH_PADDING,
            row_height: 0,
            full: false,
        }
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Set once a rectangle did not fit vertically. Later calls fail fast.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Reserves a `w x h` rectangle and returns its top-left corner.
    pub fn place(&mut self, w: u32, h: u32) -> Option<(u32, u32)> {
        if self.full || w + 2 * GLYPH_PADDING > self.size {
            return None;
        }

        if self.cursor_x + w + GLYPH_PADDING > self.size {
            self.cursor_y += self.row_height + GLYPH_PADDING;
            self.cursor_x = GLYPH_PADDING;
            self.row_height = 0;
        }

        if self.cursor_y + h + GLYPH_PADDING > self.size {
            self.full = true;
            return None;
        }

        let origin = (self.cursor_x, self.cursor_y);
        self.cursor_x += w + GLYPH_PADDING;
        self.row_height = self.row_height.max(h);
        Some(origin)
    }
}
