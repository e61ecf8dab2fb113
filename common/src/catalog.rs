//! 組込みカタログ
//!
//! モデル・ポーズ・撮影場所・スタイルの定義済み一覧。
//! プロンプト断片は生成結果の再現性に直結するため変更しないこと。

use serde::Serialize;

use crate::types::{
    Gender, ModelKind, ModelOption, OptionInfo, PoseOption, PresentationMode, SettingCategory,
    SettingOption, StyleIntensity, StyleOption,
};

/// サムネイルURL生成
fn unsplash_url(id: &str) -> String {
    format!("https://images.unsplash.com/photo-{}?auto=format&fit=crop&w=300&q=80", id)
}

/// カタログ一式
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catalog {
    pub models: Vec<ModelOption>,
    pub poses: Vec<PoseOption>,
    pub settings: Vec<SettingOption>,
    pub styles: Vec<StyleOption>,
}

impl Catalog {
    /// 組込みカタログ
    pub fn builtin() -> Self {
        Self {
            models: preset_models(),
            poses: poses(),
            settings: settings(),
            styles: styles(),
        }
    }

    pub fn preset_model(&self, id: &str) -> Option<&ModelOption> {
        self.models.iter().find(|m| m.id() == id)
    }

    pub fn pose(&self, id: &str) -> Option<&PoseOption> {
        self.poses.iter().find(|p| p.id() == id)
    }

    pub fn setting(&self, id: &str) -> Option<&SettingOption> {
        self.settings.iter().find(|s| s.id() == id)
    }

    pub fn style(&self, id: &str) -> Option<&StyleOption> {
        self.styles.iter().find(|s| s.id() == id)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn preset(
    id: &str,
    name: &str,
    mode: PresentationMode,
    gender: Option<Gender>,
    photo: &str,
    description: &str,
    fragment: &str,
) -> ModelOption {
    ModelOption {
        info: OptionInfo::new(id, name, unsplash_url(photo), description, fragment),
        kind: ModelKind::Preset { mode, gender },
    }
}

fn pose(id: &str, name: &str, mode: PresentationMode, photo: &str, description: &str, fragment: &str) -> PoseOption {
    PoseOption {
        info: OptionInfo::new(id, name, unsplash_url(photo), description, fragment),
        allowed_modes: vec![mode],
    }
}

pub fn preset_models() -> Vec<ModelOption> {
    use PresentationMode::{Model, Object};

    vec![
        preset(
            "model_f_1", "Sofia", Model, Some(Gender::Female),
            "1534528741775-53994a69daeb", "Studio Model",
            "a professional female fashion model with light skin tone and neutral expression",
        ),
        preset(
            "model_f_2", "Chloe", Model, Some(Gender::Female),
            "1524504388940-b1c1722653e1", "Editorial Model",
            "a high-fashion female model with distinctive features and confident gaze",
        ),
        preset(
            "model_m_1", "Marcus", Model, Some(Gender::Male),
            "1506794778202-cad84cf45f1d", "Athletic Model",
            "a professional male fashion model with athletic build and confident gaze",
        ),
        preset(
            "model_m_2", "David", Model, Some(Gender::Male),
            "1500648767791-00dcc994a43e", "Casual Model",
            "a relaxed male model with a friendly expression and casual stance",
        ),
        preset(
            "obj_hanger_1", "Hanger", Object, None,
            "1517705008128-16196a296a18", "Minimalist Display",
            "hanging on a high-quality wooden hanger",
        ),
        preset(
            "obj_desk_1", "Flat Lay", Object, None,
            "1493723843689-d988e3659496", "Surface Fold",
            "neatly folded and placed on a flat surface",
        ),
    ]
}

pub fn poses() -> Vec<PoseOption> {
    use PresentationMode::{Model, Object};

    vec![
        pose(
            "pose_stand_front", "Standing", Model, "1515886657613-9f3515b0c78f", "Front facing.",
            "standing facing the camera, hands relaxed by sides, symmetrical pose",
        ),
        pose(
            "pose_walking", "Walking", Model, "1469334031218-e382a71b716b", "Dynamic motion.",
            "walking towards the camera, dynamic movement in fabric, one leg forward",
        ),
        pose(
            "pose_sitting", "Sitting", Model, "1534030347209-7147fd69a398", "Relaxed stool.",
            "sitting casually on a minimal stool, one leg crossed, relaxed posture",
        ),
        pose(
            "pose_side", "Profile", Model, "1502323777036-f29e3972d82f", "Side view.",
            "standing in side profile view, highlighting the silhouette",
        ),
        pose(
            "pose_flat_straight", "Symmetrical", Object, "1550614000-4b9519e02a15", "Perfectly aligned.",
            "arranged in a perfectly symmetrical flat lay, showing full garment shape",
        ),
        pose(
            "pose_wrinkled_art", "Artistic", Object, "1489987707025-afc232f7ea0f", "Natural folds.",
            "arranged with artistic natural folds and wrinkles for texture",
        ),
    ]
}

pub fn settings() -> Vec<SettingOption> {
    let setting = |id: &str, name: &str, category, photo: &str, description: &str, fragment: &str| {
        SettingOption {
            info: OptionInfo::new(id, name, unsplash_url(photo), description, fragment),
            category,
        }
    };

    vec![
        setting(
            "set_studio_white", "Pure Studio", SettingCategory::Studio,
            "1581850518616-bcb8077a2336", "Infinity white.",
            "in a professional photography studio with an infinity white background and soft high-key lighting",
        ),
        setting(
            "set_urban", "Urban Street", SettingCategory::Outdoor,
            "1449824913935-59a10b8d2000", "Blurred city.",
            "on a busy city street with blurred urban architecture in the background, natural daylight",
        ),
        setting(
            "set_nature", "Golden Hour", SettingCategory::Outdoor,
            "1470252649378-9c29740c9fa8", "Warm field.",
            "in a natural field during golden hour with warm sun flares and organic background",
        ),
        setting(
            "set_ind_loft", "Industrial", SettingCategory::Indoor,
            "1505691938895-1cd1027d1a58", "Concrete loft.",
            "inside a modern industrial loft with concrete walls and window shadows",
        ),
    ]
}

pub fn styles() -> Vec<StyleOption> {
    let style = |id: &str, name: &str, intensity, photo: &str, description: &str, fragment: &str| {
        StyleOption {
            info: OptionInfo::new(id, name, unsplash_url(photo), description, fragment),
            intensity,
        }
    };

    vec![
        style(
            "style_commercial", "E-Commerce", StyleIntensity::Natural,
            "1441986300917-64674bd600d8", "Clean & Sharp.",
            "shot with a 85mm lens, f/8 aperture, extremely sharp details, 4k commercial product photography, true color",
        ),
        style(
            "style_editorial", "Editorial", StyleIntensity::Cinematic,
            "1496747611176-843222e1e57c", "Moody & Bold.",
            "cinematic editorial fashion photography, dramatic contrast, moody atmosphere, color graded, film grain",
        ),
        style(
            "style_minimal", "Minimal", StyleIntensity::Minimalist,
            "1494438639946-1ebd1d20bf85", "Soft & Pastel.",
            "minimalist aesthetic, soft pastel color palette, low contrast, dreamy atmosphere",
        ),
    ]
}
