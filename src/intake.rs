//! 画像ファイルの取り込み
//!
//! 拡張子ではなくバイト列から形式を判定し、デコードできることを確認してから
//! Base64化する。ファイルパスのほか Data URL も受け付ける。

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use image::ImageFormat;
use loom_lens_common::ImageData;
use tracing::debug;

use crate::error::{Result, StudioError};

/// 案内表示用の対応形式（実際はデコーダが読めるものはすべて受け付ける）
pub const SUPPORTED_FORMATS: &[ImageFormat] = &[ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::WebP];

pub fn supported_formats_label() -> String {
    SUPPORTED_FORMATS
        .iter()
        .filter_map(|f| f.extensions_str().first())
        .map(|ext| ext.to_uppercase())
        .collect::<Vec<_>>()
        .join(", ")
}

/// ファイルから画像を読み込む
pub fn load_image_file(path: &Path) -> Result<ImageData> {
    if !path.is_file() {
        return Err(StudioError::FileNotFound(path.display().to_string()));
    }

    let bytes = std::fs::read(path)?;
    // Data URLを書いたテキストファイルも受け付ける
    let image = if bytes.trim_ascii_start().starts_with(b"data:") {
        image_data_from_data_url(&String::from_utf8_lossy(&bytes))
    } else {
        image_data_from_bytes(&bytes)
    }
    .map_err(|e| StudioError::ImageLoad(format!("{}: {}", path.display(), e)))?;

    debug!(path = %path.display(), mime = %image.mime_type, bytes = bytes.len(), "image loaded");
    Ok(image)
}

/// 対話入力（ファイルパスまたは貼り付けたData URL）から読み込む
pub fn load_image_input(input: &str) -> Result<ImageData> {
    let trimmed = input.trim().trim_matches('"');
    if trimmed.starts_with("data:") {
        image_data_from_data_url(trimmed)
    } else {
        load_image_file(Path::new(trimmed))
    }
}

/// Data URLから画像データを作成（デコード確認あり）
pub fn image_data_from_data_url(data_url: &str) -> Result<ImageData> {
    let parsed = ImageData::from_data_url(data_url)?;
    let bytes = STANDARD
        .decode(parsed.data.as_bytes())
        .map_err(|e| StudioError::ImageLoad(format!("Base64デコード失敗: {}", e)))?;
    image_data_from_bytes(&bytes)
}

/// バイト列から画像データを作成
pub fn image_data_from_bytes(bytes: &[u8]) -> Result<ImageData> {
    let format = image::guess_format(bytes)?;
    image::load_from_memory_with_format(bytes, format)?;

    Ok(ImageData::new(format.to_mime_type(), STANDARD.encode(bytes)))
}
