//! Texture sources and GPU upload
//!
//! Images are shared through `Arc` so a texture uniform can tell whether it
//! was handed the same image again (pointer identity) and skip the upload.

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;
use image::imageops::FilterType;

use crate::backend::{Backend, TextureFilter, TextureHandle, TextureWrap};
use crate::error::{Result, VaderError};

/// Largest side a normalized texture is allowed to have
pub const MAX_TEXTURE_SIZE: u32 = 4096;

/// Shared RGBA image backing a `sampler2D` uniform
pub type TextureSource = Arc<RgbaImage>;

/// Load an image file into a texture source
pub fn load_texture_source(path: impl AsRef<Path>) -> std::result::Result<TextureSource, String> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|e| format!("Failed to load image {:?}: {}", path, e))?;
    Ok(Arc::new(img.to_rgba8()))
}

/// Whether two sources are the same image object
pub fn same_source(a: &TextureSource, b: &TextureSource) -> bool {
    Arc::ptr_eq(a, b)
}

pub fn is_power_of_two(value: u32) -> bool {
    value & value.wrapping_sub(1) == 0
}

fn rescale(image: &RgbaImage, size: u32) -> RgbaImage {
    image::imageops::resize(image, size, size, FilterType::Triangle)
}

/// Return a power-of-two version of `image`
///
/// Images that already have power-of-two sides are returned as-is. A
/// non-zero `target_size` forces a square of that size; otherwise the square
/// side is the smallest power of two covering the longest side, capped at
/// `MAX_TEXTURE_SIZE`.
pub fn nearest_power_of_two(image: &RgbaImage, target_size: u32) -> Cow<'_, RgbaImage> {
    let (width, height) = image.dimensions();
    if is_power_of_two(width) && is_power_of_two(height) {
        return Cow::Borrowed(image);
    }

    if target_size != 0 {
        return Cow::Owned(rescale(image, target_size));
    }

    let longest = width.max(height);
    let mut n = 2;
    while n < longest && n < MAX_TEXTURE_SIZE {
        n *= 2;
    }
    Cow::Owned(rescale(image, n))
}

/// Create a clamped, bilinear-filtered 2D texture holding `image`
pub fn make_texture(backend: &mut dyn Backend, image: &RgbaImage) -> Result<TextureHandle> {
    let texture = backend
        .create_texture()
        .ok_or_else(|| VaderError::Backend("failed to create texture".into()))?;

    backend.bind_texture_2d(Some(texture));
    backend.texture_wrap(TextureWrap::ClampToEdge);
    backend.texture_filter(TextureFilter::Linear);

    let (width, height) = image.dimensions();
    backend.tex_image_2d_rgba(width, height, image.as_raw());

    Ok(texture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{BackendCall, RecordingBackend};

    fn image(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, image::Rgba([255, 0, 0, 255]))
    }

    #[test]
    fn test_is_power_of_two() {
        assert!(is_power_of_two(1));
        assert!(is_power_of_two(256));
        assert!(!is_power_of_two(3));
        assert!(!is_power_of_two(640));
    }

    #[test]
    fn test_power_of_two_image_is_borrowed() {
        let img = image(64, 32);
        assert!(matches!(nearest_power_of_two(&img, 0), Cow::Borrowed(_)));
    }

    #[test]
    fn test_rescale_covers_longest_side() {
        let img = image(300, 100);
        let out = nearest_power_of_two(&img, 0);
        assert_eq!(out.dimensions(), (512, 512));
    }

    #[test]
    fn test_rescale_to_target() {
        let img = image(300, 100);
        assert_eq!(nearest_power_of_two(&img, 128).dimensions(), (128, 128));
    }

    #[test]
    fn test_same_source_is_identity() {
        let a: TextureSource = Arc::new(image(2, 2));
        let b: TextureSource = Arc::new(image(2, 2));
        assert!(same_source(&a, &a.clone()));
        assert!(!same_source(&a, &b));
    }

    #[test]
    fn test_make_texture_uploads() {
        let mut backend = RecordingBackend::new();
        let tex = make_texture(&mut backend, &image(4, 4)).unwrap();

        assert_eq!(backend.textures_created(), 1);
        assert!(backend.calls.contains(&BackendCall::BindTexture2D(Some(tex))));
        assert!(backend.calls.contains(&BackendCall::TexImage2D { width: 4, height: 4 }));
    }
}
