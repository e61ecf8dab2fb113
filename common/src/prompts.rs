//! プロンプト生成モジュール
//!
//! 選択状態からポーズごとの生成リクエストを組み立てる:
//! - build_pose_prompt: 1ポーズ分のプロンプト
//! - plan_batch: 選択順のポーズタスク一覧
//! - plan_edit: 生成済み画像のテキスト編集リクエスト
//!
//! 生成モデルはプロンプト構造に敏感なため、各セクションの順序と
//! プリセット/カスタムの言い回しは固定。

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::selection::{can_generate, find_model, SelectionState};
use crate::types::{GeneratedImage, ImageData, ImageOrigin, ModelOption, PoseOption, SettingOption, StyleOption};

/// 全プロンプト共通の末尾
pub const QUALITY_SUFFIX: &str = "Lighting should wrap around the fabric naturally. High fidelity, 4k.";

/// 添付画像の役割
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttachmentRole {
    ReferenceModel,
    ClothingItem,
    EditSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub role: AttachmentRole,
    pub image: ImageData,
}

/// プロンプトテキストを画像の前後どちらに置くか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PromptPosition {
    BeforeImages,
    AfterImages,
}

/// 画像生成リクエスト（1回のAPI呼び出し分）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisRequest {
    pub prompt: String,
    /// 送信順
    pub attachments: Vec<Attachment>,
    pub prompt_position: PromptPosition,
}

/// 1ポーズ分のタスク
#[derive(Debug, Clone, PartialEq)]
pub struct PoseTask {
    pub pose_id: String,
    pub pose_name: String,
    pub request: SynthesisRequest,
}

/// バッチ生成計画（選択順）
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPlan {
    pub tasks: Vec<PoseTask>,
}

impl BatchPlan {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// 編集リクエスト
#[derive(Debug, Clone, PartialEq)]
pub struct EditPlan {
    pub source_id: String,
    pub instruction: String,
    pub request: SynthesisRequest,
}

impl EditPlan {
    /// 結果画像に記録するプロンプト
    pub fn prompt_used(&self) -> String {
        GeneratedImage::edit_prompt(&self.instruction, &self.source_id)
    }

    /// 結果画像の由来
    pub fn origin(&self) -> ImageOrigin {
        ImageOrigin::Edit {
            source_id: self.source_id.clone(),
        }
    }
}

/// 1ポーズ分のプロンプト生成
///
/// 構成（固定順）:
/// 1. タスクヘッダ（プリセット / カスタム参照画像で文言が異なる）
/// 2. モデルのプロンプト断片
/// 3. ポーズ
/// 4. 撮影場所
/// 5. スタイル
/// 6. 品質・ライティングの共通末尾
pub fn build_pose_prompt(
    model: &ModelOption,
    pose: &PoseOption,
    setting: &SettingOption,
    style: &StyleOption,
) -> String {
    let subject = if model.is_custom() {
        format!(
            r#"Product Photography Mockup Generation.

TASK:
The first image provided is the REFERENCE MODEL.
The second image provided is the CLOTHING ITEM.

Generate a photorealistic image of the REFERENCE MODEL wearing the CLOTHING ITEM.
The REFERENCE MODEL is {model}.
You must preserve the facial features, body type, and skin tone of the REFERENCE MODEL exactly.
You must preserve the texture, pattern, and logo of the CLOTHING ITEM exactly.

POSE:
Change the model's pose to: {pose}."#,
            model = model.info.prompt_fragment,
            pose = pose.info.prompt_fragment,
        )
    } else {
        format!(
            r#"Product Photography Mockup Generation.

TASK:
Generate a photorealistic fashion mockup displaying the clothing item provided in the image input.
The clothing item must be worn by {model}.

POSE:
The subject is {pose}."#,
            model = model.info.prompt_fragment,
            pose = pose.info.prompt_fragment,
        )
    };

    format!(
        r#"{subject}

SETTING:
The scene is located {setting}.

STYLE & QUALITY:
{style}. {QUALITY_SUFFIX}"#,
        setting = setting.info.prompt_fragment,
        style = style.info.prompt_fragment,
    )
}

/// 選択状態からバッチ生成計画を作成
///
/// 前提: `can_generate` が真であること。IDが解決できない場合も設定エラー。
pub fn plan_batch(state: &SelectionState, catalog: &Catalog) -> Result<BatchPlan> {
    let (Some(source), Some(model_id), Some(setting_id), Some(style_id), true) = (
        state.source_image.as_ref(),
        state.model_id.as_deref(),
        state.setting_id.as_deref(),
        state.style_id.as_deref(),
        can_generate(state),
    ) else {
        return Err(Error::NotReady(missing_fields(state).join(", ")));
    };

    let model = find_model(state, catalog, model_id).ok_or_else(|| unknown("model", model_id))?;
    let setting = catalog.setting(setting_id).ok_or_else(|| unknown("setting", setting_id))?;
    let style = catalog.style(style_id).ok_or_else(|| unknown("style", style_id))?;

    let mut tasks = Vec::with_capacity(state.pose_ids.len());
    for pose_id in &state.pose_ids {
        let pose = catalog.pose(pose_id).ok_or_else(|| unknown("pose", pose_id))?;

        let mut attachments = Vec::with_capacity(2);
        if let Some(reference) = model.reference_image() {
            attachments.push(Attachment {
                role: AttachmentRole::ReferenceModel,
                image: reference.clone(),
            });
        }
        attachments.push(Attachment {
            role: AttachmentRole::ClothingItem,
            image: source.clone(),
        });

        tasks.push(PoseTask {
            pose_id: pose.id().to_string(),
            pose_name: pose.info.name.clone(),
            request: SynthesisRequest {
                prompt: build_pose_prompt(model, pose, setting, style),
                attachments,
                prompt_position: PromptPosition::BeforeImages,
            },
        });
    }

    Ok(BatchPlan { tasks })
}

/// 編集リクエストを作成（画像 → 指示文の順）
pub fn plan_edit(source: &GeneratedImage, instruction: &str) -> Result<EditPlan> {
    let instruction = instruction.trim();
    if instruction.is_empty() {
        return Err(Error::EmptyInstruction);
    }

    Ok(EditPlan {
        source_id: source.id.clone(),
        instruction: instruction.to_string(),
        request: SynthesisRequest {
            prompt: instruction.to_string(),
            attachments: vec![Attachment {
                role: AttachmentRole::EditSource,
                image: source.image.clone(),
            }],
            prompt_position: PromptPosition::AfterImages,
        },
    })
}

/// 未設定項目の一覧
pub fn missing_fields(state: &SelectionState) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if state.source_image.is_none() {
        missing.push("source image");
    }
    if state.model_id.is_none() {
        missing.push("model");
    }
    if state.pose_ids.is_empty() {
        missing.push("pose");
    }
    if state.setting_id.is_none() {
        missing.push("setting");
    }
    if state.style_id.is_none() {
        missing.push("style");
    }
    missing
}

fn unknown(kind: &'static str, id: &str) -> Error {
    Error::UnknownOption { kind, id: id.to_string() }
}
