//! スタジオの型定義
//!
//! CLIと対話スタジオで共有される型:
//! - OptionInfo: カタログ項目の共通部分
//! - ModelOption / PoseOption / SettingOption / StyleOption: 各カタログ項目
//! - ImageData: MIMEタイプ + Base64データ
//! - GeneratedImage: 生成結果（不変）

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// 提示モード（人物モデル / 物撮り）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationMode {
    Model,
    Object,
}

impl PresentationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresentationMode::Model => "model",
            PresentationMode::Object => "object",
        }
    }
}

impl fmt::Display for PresentationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// カタログ項目の共通部分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionInfo {
    pub id: String,
    pub name: String,
    /// サムネイル（URLまたはData URL）
    pub thumbnail: String,
    pub description: String,
    /// プロンプトにそのまま埋め込まれる説明文
    pub prompt_fragment: String,
}

impl OptionInfo {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        thumbnail: impl Into<String>,
        description: impl Into<String>,
        prompt_fragment: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            thumbnail: thumbnail.into(),
            description: description.into(),
            prompt_fragment: prompt_fragment.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Neutral,
}

/// モデルの種類
///
/// カスタムモデルは常に人物モデル扱い（実効モード = Model）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModelKind {
    Preset {
        mode: PresentationMode,
        gender: Option<Gender>,
    },
    Custom {
        reference: ImageData,
    },
}

/// モデル（被写体）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOption {
    #[serde(flatten)]
    pub info: OptionInfo,
    pub kind: ModelKind,
}

impl ModelOption {
    pub const CUSTOM_NAME: &'static str = "Custom Model";
    pub const CUSTOM_DESCRIPTION: &'static str = "User uploaded";
    pub const CUSTOM_FRAGMENT: &'static str = "the person in the reference image";

    /// アップロード画像からカスタムモデルを作成
    pub fn custom(id: impl Into<String>, reference: ImageData) -> Self {
        Self {
            info: OptionInfo::new(
                id,
                Self::CUSTOM_NAME,
                reference.to_data_url(),
                Self::CUSTOM_DESCRIPTION,
                Self::CUSTOM_FRAGMENT,
            ),
            kind: ModelKind::Custom { reference },
        }
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    /// ポーズ絞込みに使う実効モード
    pub fn effective_mode(&self) -> PresentationMode {
        match &self.kind {
            ModelKind::Preset { mode, .. } => *mode,
            ModelKind::Custom { .. } => PresentationMode::Model,
        }
    }

    pub fn reference_image(&self) -> Option<&ImageData> {
        match &self.kind {
            ModelKind::Custom { reference } => Some(reference),
            ModelKind::Preset { .. } => None,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self.kind, ModelKind::Custom { .. })
    }
}

/// ポーズ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseOption {
    #[serde(flatten)]
    pub info: OptionInfo,
    pub allowed_modes: Vec<PresentationMode>,
}

impl PoseOption {
    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn allows(&self, mode: PresentationMode) -> bool {
        self.allowed_modes.contains(&mode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingCategory {
    Indoor,
    Outdoor,
    Studio,
    Abstract,
}

/// 撮影場所
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingOption {
    #[serde(flatten)]
    pub info: OptionInfo,
    pub category: SettingCategory,
}

impl SettingOption {
    pub fn id(&self) -> &str {
        &self.info.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleIntensity {
    Natural,
    Cinematic,
    Minimalist,
}

/// 撮影スタイル
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleOption {
    #[serde(flatten)]
    pub info: OptionInfo,
    pub intensity: StyleIntensity,
}

impl StyleOption {
    pub fn id(&self) -> &str {
        &self.info.id
    }
}

/// 画像データ（MIMEタイプ + Base64ペイロード）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    pub mime_type: String,
    pub data: String,
}

impl ImageData {
    /// ヘッダが読めない場合のMIMEタイプ
    pub const FALLBACK_MIME: &'static str = "image/jpeg";

    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Data URLをパース
    ///
    /// "data:image/png;base64,..." 形式ならヘッダからMIMEタイプを取得。
    /// ヘッダがない場合は全体をペイロードとみなし image/jpeg とする。
    ///
    /// # Examples
    /// ```
    /// use loom_lens_common::ImageData;
    ///
    /// let image = ImageData::from_data_url("data:image/png;base64,iVBORw0").unwrap();
    /// assert_eq!(image.mime_type, "image/png");
    /// assert_eq!(image.data, "iVBORw0");
    /// ```
    pub fn from_data_url(data_url: &str) -> Result<Self> {
        lazy_static::lazy_static! {
            static ref DATA_URL_RE: Regex =
                Regex::new(r"^data:(image/[a-zA-Z0-9.+-]+);base64,").unwrap();
        }

        let trimmed = data_url.trim();
        let (mime_type, payload) = match DATA_URL_RE.captures(trimmed) {
            Some(cap) => {
                let header_len = cap[0].len();
                (cap[1].to_string(), &trimmed[header_len..])
            }
            None => (Self::FALLBACK_MIME.to_string(), trimmed),
        };

        if payload.is_empty() {
            return Err(Error::InvalidDataUrl("empty payload".into()));
        }

        Ok(Self::new(mime_type, payload))
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// 生成結果の由来
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ImageOrigin {
    #[default]
    Batch,
    Edit {
        #[serde(rename = "sourceId")]
        source_id: String,
    },
}

/// 生成結果
///
/// 作成後は変更しない。全体リセットでのみ破棄される。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub id: String,
    pub image: ImageData,
    pub prompt_used: String,
    /// 作成時刻（UNIXミリ秒）
    pub timestamp: i64,
    #[serde(default)]
    pub origin: ImageOrigin,
}

impl GeneratedImage {
    /// バッチ生成の結果として作成
    pub fn new(id: impl Into<String>, image: ImageData, prompt_used: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            image,
            prompt_used: prompt_used.into(),
            timestamp,
            origin: ImageOrigin::Batch,
        }
    }

    pub fn with_origin(mut self, origin: ImageOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// 編集結果に記録するプロンプト
    pub fn edit_prompt(instruction: &str, source_id: &str) -> String {
        format!("Edit: \"{}\" based on {}", instruction, source_id)
    }

    pub fn is_edit(&self) -> bool {
        matches!(self.origin, ImageOrigin::Edit { .. })
    }

    /// 一覧表示用ラベル（indexは0始まり）
    pub fn label(&self, index: usize) -> String {
        if self.is_edit() {
            "Refined Edit".to_string()
        } else {
            format!("Variation #{}", index + 1)
        }
    }
}
