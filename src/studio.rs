//! スタジオセッション
//!
//! Workflow（状態遷移）と ImageSynthesizer（送信手段）をつなぐ。
//! 失敗時の戻り先はここで決める:
//! - バッチ全体の失敗 → 設定画面へ戻す（選択は保持）
//! - 編集の失敗 → 編集画面を開いたまま

use loom_lens_common::{Catalog, GeneratedImage, ImageData, SelectionAction, View, Workflow};
use tracing::{info, warn};

use crate::dispatch::{self, ImageSynthesizer};
use crate::error::Result;

/// 生成1回分の集計
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationSummary {
    pub poses: usize,
    pub failed_poses: usize,
    pub produced: usize,
}

pub struct Studio<S: ImageSynthesizer> {
    catalog: Catalog,
    workflow: Workflow,
    synthesizer: S,
    keep_custom_models_on_reset: bool,
}

impl<S: ImageSynthesizer> Studio<S> {
    pub fn new(catalog: Catalog, synthesizer: S) -> Self {
        Self {
            catalog,
            workflow: Workflow::new(),
            synthesizer,
            keep_custom_models_on_reset: false,
        }
    }

    pub fn keep_custom_models_on_reset(mut self, keep: bool) -> Self {
        self.keep_custom_models_on_reset = keep;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn synthesizer(&self) -> &S {
        &self.synthesizer
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn view(&self) -> View {
        self.workflow.view()
    }

    pub fn results(&self) -> &[GeneratedImage] {
        self.workflow.results()
    }

    pub fn upload_source(&mut self, image: ImageData) -> Result<()> {
        self.workflow.upload_source(image, &self.catalog)?;
        Ok(())
    }

    pub fn apply(&mut self, action: SelectionAction) -> Result<()> {
        self.workflow.apply(action, &self.catalog)?;
        Ok(())
    }

    /// カスタムモデルを追加して選択。作成したIDを返す
    pub fn upload_custom_model(&mut self, image: ImageData) -> Result<String> {
        let id = format!("custom_{}", uuid::Uuid::new_v4().simple());
        self.apply(SelectionAction::UploadCustomModel { id: id.clone(), image })?;
        info!(id = %id, "custom model added");
        Ok(id)
    }

    /// 選択中の全ポーズを生成
    ///
    /// `on_task(番号, 総数, ポーズ名)` は各ポーズの送信直前に呼ばれる。
    pub async fn generate(&mut self, on_task: impl FnMut(usize, usize, &str)) -> Result<GenerationSummary> {
        let plan = self.workflow.begin_dispatch(&self.catalog)?;
        let poses = plan.len();

        match dispatch::run_batch(&self.synthesizer, &plan, on_task).await {
            Ok(report) => {
                let failed_poses = report.failed();
                let produced = report.produced();
                if failed_poses > 0 {
                    warn!(failed = ?report.failed_pose_ids(), "some poses were skipped");
                }
                let images = report.into_images(dispatch::new_generated_image);
                self.workflow.complete_dispatch(images)?;

                info!(poses, failed_poses, produced, "generation finished");
                Ok(GenerationSummary { poses, failed_poses, produced })
            }
            Err(err) => {
                warn!(error = %err, "generation aborted");
                self.workflow.fail_dispatch()?;
                Err(err)
            }
        }
    }

    pub fn back_to_studio(&mut self) -> Result<()> {
        self.workflow.back_to_studio()?;
        Ok(())
    }

    pub fn open_editor(&mut self, image_id: &str) -> Result<()> {
        self.workflow.open_editor(image_id)?;
        Ok(())
    }

    pub fn set_edit_instruction(&mut self, instruction: impl Into<String>) -> Result<()> {
        self.workflow.set_edit_instruction(instruction)?;
        Ok(())
    }

    /// 編集を送信。成功時は新しい画像（一覧の先頭）を返す
    pub async fn submit_edit(&mut self) -> Result<GeneratedImage> {
        let plan = self.workflow.begin_edit()?;

        match dispatch::run_edit(&self.synthesizer, &plan).await {
            Ok(image) => {
                self.workflow.complete_edit(image.clone())?;
                info!(source = %plan.source_id, id = %image.id, "edit finished");
                Ok(image)
            }
            Err(err) => {
                self.workflow.fail_edit()?;
                Err(err)
            }
        }
    }

    pub fn cancel_edit(&mut self) -> Result<()> {
        self.workflow.cancel_edit()?;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.workflow.reset(self.keep_custom_models_on_reset, &self.catalog);
        info!(keep_custom_models = self.keep_custom_models_on_reset, "studio reset");
    }
}
