//! スタジオ全体の画面遷移
//!
//! ```text
//! Idle → Configuring → Dispatching ─┬─ 成功 → Reviewing ⇄ Editing
//!                        ↑          └─ 失敗 → Configuring
//! ```
//!
//! 生成・編集の呼び出し中は次の呼び出しを受け付けない（同時実行は最大1件）。
//! 不正な遷移はエラーを返し、状態は変更しない。

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::prompts::{plan_batch, plan_edit, BatchPlan, EditPlan};
use crate::selection::{reduce, SelectionAction, SelectionState};
use crate::types::{GeneratedImage, ImageData};

/// 画面状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Idle,
    Configuring,
    Dispatching,
    Reviewing,
    Editing,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            View::Idle => "idle",
            View::Configuring => "configuring",
            View::Dispatching => "dispatching",
            View::Reviewing => "reviewing",
            View::Editing => "editing",
        };
        f.write_str(name)
    }
}

/// 編集中の状態
#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    pub target: GeneratedImage,
    pub instruction: String,
    pub in_flight: bool,
}

/// スタジオのワークフロー
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
    view: View,
    selection: SelectionState,
    results: Vec<GeneratedImage>,
    editing: Option<EditSession>,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

impl Workflow {
    pub fn new() -> Self {
        Self {
            view: View::Idle,
            selection: SelectionState::default(),
            results: Vec::new(),
            editing: None,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn results(&self) -> &[GeneratedImage] {
        &self.results
    }

    pub fn editing(&self) -> Option<&EditSession> {
        self.editing.as_ref()
    }

    /// 元画像をアップロードして設定画面へ
    pub fn upload_source(&mut self, image: ImageData, catalog: &Catalog) -> Result<()> {
        self.expect(&[View::Idle, View::Configuring], "upload a source image")?;
        self.dispatch(SelectionAction::SetSourceImage(image), catalog);
        self.view = View::Configuring;
        Ok(())
    }

    /// 選択アクションを適用（設定画面のみ）
    pub fn apply(&mut self, action: SelectionAction, catalog: &Catalog) -> Result<()> {
        self.expect(&[View::Configuring], "change the selection")?;
        self.dispatch(action, catalog);
        Ok(())
    }

    /// 生成開始。計画を返して Dispatching へ
    pub fn begin_dispatch(&mut self, catalog: &Catalog) -> Result<BatchPlan> {
        self.expect(&[View::Configuring], "generate")?;
        let plan = plan_batch(&self.selection, catalog)?;
        self.view = View::Dispatching;
        Ok(plan)
    }

    /// 生成成功。結果を末尾に追加して Reviewing へ
    pub fn complete_dispatch(&mut self, images: Vec<GeneratedImage>) -> Result<()> {
        self.expect(&[View::Dispatching], "complete a generation")?;
        self.results.extend(images);
        self.view = View::Reviewing;
        Ok(())
    }

    /// 生成失敗。選択を保持したまま設定画面へ戻る
    pub fn fail_dispatch(&mut self) -> Result<()> {
        self.expect(&[View::Dispatching], "fail a generation")?;
        self.view = View::Configuring;
        Ok(())
    }

    /// 結果を保持したまま設定画面へ戻る
    pub fn back_to_studio(&mut self) -> Result<()> {
        self.expect(&[View::Reviewing], "return to the studio")?;
        self.view = View::Configuring;
        Ok(())
    }

    /// 編集画面を開く
    pub fn open_editor(&mut self, image_id: &str) -> Result<()> {
        self.expect(&[View::Reviewing], "open the editor")?;
        let target = self
            .results
            .iter()
            .find(|img| img.id == image_id)
            .cloned()
            .ok_or_else(|| Error::UnknownImage(image_id.to_string()))?;
        self.editing = Some(EditSession {
            target,
            instruction: String::new(),
            in_flight: false,
        });
        self.view = View::Editing;
        Ok(())
    }

    pub fn set_edit_instruction(&mut self, instruction: impl Into<String>) -> Result<()> {
        let session = self.session_mut("type an edit instruction")?;
        if session.in_flight {
            return Err(Error::EditInFlight);
        }
        session.instruction = instruction.into();
        Ok(())
    }

    /// 編集開始
    pub fn begin_edit(&mut self) -> Result<EditPlan> {
        let session = self.session_mut("submit an edit")?;
        if session.in_flight {
            return Err(Error::EditInFlight);
        }
        let plan = plan_edit(&session.target, &session.instruction)?;
        session.in_flight = true;
        Ok(plan)
    }

    /// 編集成功。結果を先頭に追加し、指示文をクリアして Reviewing へ
    pub fn complete_edit(&mut self, image: GeneratedImage) -> Result<()> {
        let session = self.session_mut("complete an edit")?;
        if !session.in_flight {
            return Err(Error::InvalidTransition { from: View::Editing, action: "complete an edit" });
        }
        self.results.insert(0, image);
        self.editing = None;
        self.view = View::Reviewing;
        Ok(())
    }

    /// 編集失敗。編集画面は開いたまま（再試行可能）
    pub fn fail_edit(&mut self) -> Result<()> {
        let session = self.session_mut("fail an edit")?;
        session.in_flight = false;
        Ok(())
    }

    /// 編集を閉じる
    pub fn cancel_edit(&mut self) -> Result<()> {
        let session = self.session_mut("close the editor")?;
        if session.in_flight {
            return Err(Error::EditInFlight);
        }
        self.editing = None;
        self.view = View::Reviewing;
        Ok(())
    }

    /// 全体リセット（結果・元画像・選択を破棄して Idle へ）
    pub fn reset(&mut self, keep_custom_models: bool, catalog: &Catalog) {
        self.dispatch(SelectionAction::Reset { keep_custom_models }, catalog);
        self.results.clear();
        self.editing = None;
        self.view = View::Idle;
    }

    fn dispatch(&mut self, action: SelectionAction, catalog: &Catalog) {
        let state = std::mem::take(&mut self.selection);
        self.selection = reduce(state, action, catalog);
    }

    fn expect(&self, allowed: &[View], action: &'static str) -> Result<()> {
        if allowed.contains(&self.view) {
            Ok(())
        } else {
            Err(Error::InvalidTransition { from: self.view, action })
        }
    }

    fn session_mut(&mut self, action: &'static str) -> Result<&mut EditSession> {
        let from = self.view;
        match (self.view, self.editing.as_mut()) {
            (View::Editing, Some(session)) => Ok(session),
            _ => Err(Error::InvalidTransition { from, action }),
        }
    }
}
