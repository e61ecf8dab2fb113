//! 生成リクエストの送信
//!
//! - run_batch: ポーズごとに1件ずつ順番に送信（並列化しない）。
//!   ポーズ単位の失敗はログに残してスキップし、部分結果を返す。
//!   送信手段そのものが使えない場合（APIキー未設定など）はバッチ全体が失敗。
//! - run_edit: 1件送信し、画像がなければエラー。

use async_trait::async_trait;
use loom_lens_common::{BatchPlan, EditPlan, GeneratedImage, ImageData, SynthesisRequest};
use tracing::{error, info, warn};

use crate::error::{Result, StudioError};

/// 画像生成サービス
#[async_trait]
pub trait ImageSynthesizer: Send + Sync {
    /// 送信前の前提チェック（認証情報など）
    fn ensure_ready(&self) -> Result<()> {
        Ok(())
    }

    /// 1回の生成呼び出し。返却画像が0件でもエラーではない
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<ImageData>>;
}

/// ポーズ1件の結果
#[derive(Debug)]
pub struct TaskOutcome {
    pub pose_id: String,
    pub prompt: String,
    pub result: Result<Vec<ImageData>>,
}

/// バッチ全体の結果
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<TaskOutcome>,
}

impl BatchReport {
    /// 成功したポーズの画像を選択順に連結
    pub fn into_images(self, mut make_image: impl FnMut(ImageData, &str) -> GeneratedImage) -> Vec<GeneratedImage> {
        let mut images = Vec::new();
        for outcome in self.outcomes {
            if let Ok(datas) = outcome.result {
                for data in datas {
                    images.push(make_image(data, &outcome.prompt));
                }
            }
        }
        images
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    pub fn failed_pose_ids(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_err())
            .map(|o| o.pose_id.as_str())
            .collect()
    }

    pub fn produced(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(Vec::len)
            .sum()
    }
}

/// 生成結果を作成（ID・タイムスタンプ付与）
pub fn new_generated_image(image: ImageData, prompt: &str) -> GeneratedImage {
    GeneratedImage::new(
        uuid::Uuid::new_v4().to_string(),
        image,
        prompt,
        chrono::Utc::now().timestamp_millis(),
    )
}

/// バッチ生成（ポーズ順に逐次実行）
pub async fn run_batch<S: ImageSynthesizer + ?Sized>(
    synthesizer: &S,
    plan: &BatchPlan,
    mut on_task: impl FnMut(usize, usize, &str),
) -> Result<BatchReport> {
    synthesizer.ensure_ready()?;

    let total = plan.len();
    let mut report = BatchReport::default();

    for (idx, task) in plan.tasks.iter().enumerate() {
        on_task(idx + 1, total, &task.pose_name);

        let result = synthesizer.synthesize(&task.request).await;
        match &result {
            Ok(images) if images.is_empty() => {
                warn!(pose = %task.pose_id, "no image returned for pose");
            }
            Ok(images) => {
                info!(pose = %task.pose_id, count = images.len(), "pose generated");
            }
            Err(err) => {
                error!(pose = %task.pose_name, error = %err, "Error generating mockup for pose");
            }
        }

        report.outcomes.push(TaskOutcome {
            pose_id: task.pose_id.clone(),
            prompt: task.request.prompt.clone(),
            result,
        });
    }

    Ok(report)
}

/// テキスト編集（1枚必須）
pub async fn run_edit<S: ImageSynthesizer + ?Sized>(synthesizer: &S, plan: &EditPlan) -> Result<GeneratedImage> {
    synthesizer.ensure_ready()?;

    let images = synthesizer.synthesize(&plan.request).await.map_err(|err| {
        error!(image_id = %plan.source_id, error = %err, "Error editing mockup");
        err
    })?;

    let image = images
        .into_iter()
        .next()
        .ok_or_else(|| StudioError::NoImageReturned(format!("edit of {}", plan.source_id)))?;

    Ok(new_generated_image(image, &plan.prompt_used()).with_origin(plan.origin()))
}
