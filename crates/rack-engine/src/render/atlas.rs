use thiserror::Error;

/// Largest atlas the texel coordinate packing can address.
pub const MAX_ATLAS_SIZE: u32 = u16::MAX as u32 + 1;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum AtlasError {
    #[error("atlas size {0} must be between 1 and {MAX_ATLAS_SIZE}")]
    InvalidSize(u32),
    #[error("atlas pixel data is {got} bytes, a {size}x{size} RGBA8 image needs {expected}")]
    PixelCount { size: u32, expected: usize, got: usize },
    #[error("atlas is {got}x{got}, texel coordinates were authored for {expected}x{expected}")]
    SizeMismatch { expected: u32, got: u32 },
}

/// Square RGBA8 distance-field image, CPU side.
///
/// RGB hold the three distance channels (0.5 = edge), alpha is unused by the
/// shader. Uploaded to the GPU with [`FrameRenderer::set_atlas`](super::FrameRenderer::set_atlas).
#[derive(Debug, Clone, PartialEq)]
pub struct FontAtlas {
    size: u32,
    pixels: Vec<u8>,
}

impl FontAtlas {
    /// All-outside atlas.
    pub fn blank(size: u32) -> Result<Self, AtlasError> {
        check_size(size)?;
        let len = (size as usize) * (size as usize) * 4;
        let mut pixels = vec![0u8; len];
        for px in pixels.chunks_exact_mut(4) {
            px[3] = 255;
        }
        Ok(Self { size, pixels })
    }

    pub fn from_rgba8(size: u32, pixels: Vec<u8>) -> Result<Self, AtlasError> {
        check_size(size)?;
        let expected = (size as usize) * (size as usize) * 4;
        if pixels.len() != expected {
            return Err(AtlasError::PixelCount {
                size,
                expected,
                got: pixels.len(),
            });
        }
        Ok(Self { size, pixels })
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Bytes per row of the RGBA8 image.
    #[inline]
    pub fn bytes_per_row(&self) -> u32 {
        self.size * 4
    }

    /// RGB distance channels at texel `(x, y)`, in `[0, 1]`.
    pub fn distance_at(&self, x: u32, y: u32) -> Option<[f32; 3]> {
        if x >= self.size || y >= self.size {
            return None;
        }
        let i = (y as usize * self.size as usize + x as usize) * 4;
        let px = &self.pixels[i..i + 3];
        Some([px[0], px[1], px[2]].map(|c| c as f32 / 255.0))
    }

    /// Copies a `w x h` single-channel field into all three channels at
    /// `(x, y)`. Parts outside the atlas are dropped.
    pub fn blit_field(&mut self, x: u32, y: u32, w: u32, h: u32, field: &[u8]) {
        debug_assert_eq!(field.len(), (w * h) as usize);
        for row in 0..h {
            let ty = y + row;
            if ty >= self.size {
                break;
            }
            for col in 0..w {
                let tx = x + col;
                if tx >= self.size {
                    break;
                }
                let Some(&d) = field.get((row * w + col) as usize) else { return };
                let i = (ty as usize * self.size as usize + tx as usize) * 4;
                self.pixels[i..i + 4].copy_from_slice(&[d, d, d, 255]);
            }
        }
    }
}

fn check_size(size: u32) -> Result<(), AtlasError> {
    if size == 0 || size > MAX_ATLAS_SIZE {
        return Err(AtlasError::InvalidSize(size));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_pixel_count() {
        let err = FontAtlas::from_rgba8(4, vec![0; 10]).unwrap_err();
        assert_eq!(
            err,
            AtlasError::PixelCount {
                size: 4,
                expected: 64,
                got: 10
            }
        );
        assert_eq!(FontAtlas::blank(0).unwrap_err(), AtlasError::InvalidSize(0));
    }

    #[test]
    fn blit_replicates_channels_and_clips() {
        let mut atlas = FontAtlas::blank(4).unwrap();
        atlas.blit_field(3, 3, 2, 2, &[255, 10, 20, 30]);
        assert_eq!(atlas.distance_at(3, 3), Some([1.0, 1.0, 1.0]));
        assert_eq!(atlas.distance_at(2, 3), Some([0.0, 0.0, 0.0]));
        assert_eq!(atlas.distance_at(4, 0), None);
    }
}
