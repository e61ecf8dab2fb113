//! 生成結果のPNG保存

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use image::ImageFormat;
use loom_lens_common::GeneratedImage;
use tracing::{debug, info};

use crate::error::{Result, StudioError};

pub fn mockup_file_name(index: usize) -> String {
    format!("loom-lens-mockup-{}.png", index)
}

/// 画像をPNGバイト列に変換（PNG以外は再エンコード）
pub fn to_png_bytes(image: &GeneratedImage) -> Result<Vec<u8>> {
    let bytes = STANDARD
        .decode(image.image.data.trim())
        .map_err(|e| StudioError::ImageLoad(format!("Base64デコード失敗 ({}): {}", image.id, e)))?;

    if image::guess_format(&bytes).ok() == Some(ImageFormat::Png) {
        return Ok(bytes);
    }

    debug!(id = %image.id, mime = %image.image.mime_type, "transcoding to png");
    let decoded = image::load_from_memory(&bytes)?;
    let mut out = std::io::Cursor::new(Vec::new());
    decoded.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// `dir/loom-lens-mockup-<index>.png` に保存
pub fn save_png(image: &GeneratedImage, dir: &Path, index: usize) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(mockup_file_name(index));
    std::fs::write(&path, to_png_bytes(image)?)?;
    info!(path = %path.display(), "mockup saved");
    Ok(path)
}

/// 出力先で未使用の最小番号
pub fn next_free_index(dir: &Path) -> usize {
    (1..)
        .find(|idx| !dir.join(mockup_file_name(*idx)).exists())
        .unwrap_or(1)
}

/// 既存ファイルを上書きしない番号で保存
pub fn save_png_unused(image: &GeneratedImage, dir: &Path) -> Result<PathBuf> {
    save_png(image, dir, next_free_index(dir))
}

/// 全結果を表示順（1始まり）で保存
pub fn save_all(images: &[GeneratedImage], dir: &Path) -> Result<Vec<PathBuf>> {
    images
        .iter()
        .enumerate()
        .map(|(idx, image)| save_png(image, dir, idx + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use loom_lens_common::ImageData;

    fn generated(format: ImageFormat, mime: &str) -> GeneratedImage {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(3, 2, Rgb([10, 20, 30]));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        GeneratedImage::new("img-1", ImageData::new(mime, STANDARD.encode(buf.into_inner())), "prompt", 0)
    }

    #[test]
    fn test_file_name() {
        assert_eq!(mockup_file_name(3), "loom-lens-mockup-3.png");
    }

    #[test]
    fn test_png_written_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let image = generated(ImageFormat::Png, "image/png");
        let path = save_png(&image, dir.path(), 1).unwrap();

        assert_eq!(path.file_name().unwrap(), "loom-lens-mockup-1.png");
        assert_eq!(std::fs::read(&path).unwrap(), STANDARD.decode(&image.image.data).unwrap());
    }

    #[test]
    fn test_jpeg_transcoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_png(&generated(ImageFormat::Jpeg, "image/jpeg"), dir.path(), 2).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
    }

    #[test]
    fn test_bad_base64() {
        let image = GeneratedImage::new("x", ImageData::new("image/png", "***"), "p", 0);
        assert!(matches!(to_png_bytes(&image), Err(StudioError::ImageLoad(_))));
    }

    #[test]
    fn test_save_unused_keeps_existing_mockups() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("loom-lens-mockup-1.png");
        std::fs::write(&first, b"generated earlier").unwrap();
        std::fs::write(dir.path().join("loom-lens-mockup-3.png"), b"generated earlier").unwrap();

        let path = save_png_unused(&generated(ImageFormat::Png, "image/png"), dir.path()).unwrap();

        assert_eq!(path.file_name().unwrap(), "loom-lens-mockup-2.png");
        assert_eq!(std::fs::read(&first).unwrap(), b"generated earlier");
        assert_eq!(next_free_index(dir.path()), 4);
    }

    #[test]
    fn test_next_free_index_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(next_free_index(dir.path()), 1);
        assert_eq!(next_free_index(&dir.path().join("missing")), 1);
    }

    #[test]
    fn test_save_all_numbering() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![
            generated(ImageFormat::Png, "image/png"),
            generated(ImageFormat::Png, "image/png"),
        ];
        let paths = save_all(&images, dir.path()).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(dir.path().join("loom-lens-mockup-2.png").exists());
    }
}
