//! 選択状態マシン
//!
//! モデル・ポーズ・撮影場所・スタイル・元画像の選択を保持し、
//! アクションを適用する reducer と派生値（生成可否・選択可能ポーズ）を提供する。
//!
//! 不正なIDは「見つからない」として扱い、状態を変更しない。

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::types::{ImageData, ModelOption, PoseOption, PresentationMode};

/// 同時に選択できるポーズ数の上限
pub const MAX_POSES: usize = 3;

/// 選択状態
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    /// 衣類の元画像
    pub source_image: Option<ImageData>,
    /// アップロードされたカスタムモデル（新しい順）
    pub custom_models: Vec<ModelOption>,
    pub model_id: Option<String>,
    /// 選択順を保持
    pub pose_ids: Vec<String>,
    pub setting_id: Option<String>,
    pub style_id: Option<String>,
}

/// 選択アクション
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionAction {
    SetSourceImage(ImageData),
    SelectModel(String),
    TogglePose(String),
    SelectSetting(String),
    SelectStyle(String),
    /// カスタムモデルを先頭に追加して即選択
    UploadCustomModel { id: String, image: ImageData },
    /// 選択と元画像をクリア
    Reset { keep_custom_models: bool },
}

/// アクションを適用して次の状態を返す
pub fn reduce(state: SelectionState, action: SelectionAction, catalog: &Catalog) -> SelectionState {
    match action {
        SelectionAction::SetSourceImage(image) => SelectionState {
            source_image: Some(image),
            ..state
        },
        SelectionAction::SelectModel(id) => select_model(state, &id, catalog),
        SelectionAction::TogglePose(id) => toggle_pose(state, &id, catalog),
        SelectionAction::SelectSetting(id) => {
            if catalog.setting(&id).is_none() {
                return state;
            }
            SelectionState {
                setting_id: Some(id),
                ..state
            }
        }
        SelectionAction::SelectStyle(id) => {
            if catalog.style(&id).is_none() {
                return state;
            }
            SelectionState {
                style_id: Some(id),
                ..state
            }
        }
        SelectionAction::UploadCustomModel { id, image } => {
            let mut state = state;
            state.custom_models.insert(0, ModelOption::custom(id.clone(), image));
            select_model(state, &id, catalog)
        }
        SelectionAction::Reset { keep_custom_models } => SelectionState {
            custom_models: if keep_custom_models {
                state.custom_models
            } else {
                Vec::new()
            },
            ..SelectionState::default()
        },
    }
}

fn select_model(mut state: SelectionState, id: &str, catalog: &Catalog) -> SelectionState {
    let Some(mode) = find_model(&state, catalog, id).map(ModelOption::effective_mode) else {
        return state;
    };

    // 1つでも非対応のポーズがあれば全解除（部分的な絞込みはしない）
    let all_compatible = state
        .pose_ids
        .iter()
        .all(|pose_id| catalog.pose(pose_id).is_some_and(|p| p.allows(mode)));
    if !all_compatible {
        state.pose_ids.clear();
    }

    state.model_id = Some(id.to_string());
    state
}

fn toggle_pose(mut state: SelectionState, id: &str, catalog: &Catalog) -> SelectionState {
    if let Some(pos) = state.pose_ids.iter().position(|p| p == id) {
        state.pose_ids.remove(pos);
        return state;
    }

    // モデル未選択時はポーズ選択不可
    let Some(mode) = active_mode(&state, catalog) else {
        return state;
    };
    let Some(pose) = catalog.pose(id) else {
        return state;
    };
    if !pose.allows(mode) || state.pose_ids.len() >= MAX_POSES {
        return state;
    }

    state.pose_ids.push(id.to_string());
    state
}

/// カスタムモデル + 組込みモデル（カスタムが先頭）
pub fn all_models<'a>(state: &'a SelectionState, catalog: &'a Catalog) -> Vec<&'a ModelOption> {
    state.custom_models.iter().chain(catalog.models.iter()).collect()
}

/// IDからモデルを検索（カスタム優先）
pub fn find_model<'a>(state: &'a SelectionState, catalog: &'a Catalog, id: &str) -> Option<&'a ModelOption> {
    state
        .custom_models
        .iter()
        .find(|m| m.id() == id)
        .or_else(|| catalog.preset_model(id))
}

/// 選択中モデル
pub fn selected_model<'a>(state: &'a SelectionState, catalog: &'a Catalog) -> Option<&'a ModelOption> {
    state
        .model_id
        .as_deref()
        .and_then(|id| find_model(state, catalog, id))
}

/// 選択中モデルの実効モード
pub fn active_mode(state: &SelectionState, catalog: &Catalog) -> Option<PresentationMode> {
    selected_model(state, catalog).map(ModelOption::effective_mode)
}

/// 生成ボタンの有効判定
pub fn can_generate(state: &SelectionState) -> bool {
    state.source_image.is_some()
        && state.model_id.is_some()
        && state.setting_id.is_some()
        && state.style_id.is_some()
        && !state.pose_ids.is_empty()
}

/// 表示対象のポーズ一覧
#[derive(Debug, Clone, PartialEq)]
pub struct PoseAvailability<'a> {
    pub poses: Vec<&'a PoseOption>,
    /// モデル未選択のため選択不可
    pub inert: bool,
}

/// 選択中モデルで使えるポーズ
///
/// モデル未選択時は全ポーズを選択不可として返す。
pub fn available_poses<'a>(state: &SelectionState, catalog: &'a Catalog) -> PoseAvailability<'a> {
    match active_mode(state, catalog) {
        Some(mode) => PoseAvailability {
            poses: catalog.poses.iter().filter(|p| p.allows(mode)).collect(),
            inert: false,
        },
        None => PoseAvailability {
            poses: catalog.poses.iter().collect(),
            inert: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> ImageData {
        ImageData::new("image/png", "AAAA")
    }

    fn apply(state: SelectionState, actions: Vec<SelectionAction>, catalog: &Catalog) -> SelectionState {
        actions.into_iter().fold(state, |s, a| reduce(s, a, catalog))
    }

    fn ready_state(catalog: &Catalog) -> SelectionState {
        apply(
            SelectionState::default(),
            vec![
                SelectionAction::SetSourceImage(image()),
                SelectionAction::SelectModel("model_f_1".into()),
                SelectionAction::TogglePose("pose_walking".into()),
                SelectionAction::SelectSetting("set_urban".into()),
                SelectionAction::SelectStyle("style_editorial".into()),
            ],
            catalog,
        )
    }

    // =============================================
    // TogglePose
    // =============================================

    #[test]
    fn test_toggle_pose_cap_and_no_duplicates() {
        let catalog = Catalog::builtin();
        let mut state = reduce(SelectionState::default(), SelectionAction::SelectModel("model_m_1".into()), &catalog);
        let sequence = [
            "pose_stand_front", "pose_walking", "pose_stand_front", "pose_sitting",
            "pose_side", "pose_walking", "pose_stand_front", "pose_side", "pose_side",
        ];
        for id in sequence {
            state = reduce(state, SelectionAction::TogglePose(id.into()), &catalog);
            assert!(state.pose_ids.len() <= MAX_POSES);
            let mut unique = state.pose_ids.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), state.pose_ids.len());
        }
    }

    #[test]
    fn test_toggle_pose_ignores_fourth_silently() {
        let catalog = Catalog::builtin();
        let state = apply(
            SelectionState::default(),
            vec![
                SelectionAction::SelectModel("model_f_2".into()),
                SelectionAction::TogglePose("pose_stand_front".into()),
                SelectionAction::TogglePose("pose_walking".into()),
                SelectionAction::TogglePose("pose_sitting".into()),
                SelectionAction::TogglePose("pose_side".into()),
            ],
            &catalog,
        );
        assert_eq!(state.pose_ids, vec!["pose_stand_front", "pose_walking", "pose_sitting"]);
    }

    #[test]
    fn test_toggle_pose_removes_and_keeps_order() {
        let catalog = Catalog::builtin();
        let state = apply(
            SelectionState::default(),
            vec![
                SelectionAction::SelectModel("model_f_1".into()),
                SelectionAction::TogglePose("pose_side".into()),
                SelectionAction::TogglePose("pose_walking".into()),
                SelectionAction::TogglePose("pose_stand_front".into()),
                SelectionAction::TogglePose("pose_walking".into()),
            ],
            &catalog,
        );
        assert_eq!(state.pose_ids, vec!["pose_side", "pose_stand_front"]);
    }

    #[test]
    fn test_toggle_pose_without_model_is_noop() {
        let catalog = Catalog::builtin();
        let state = reduce(SelectionState::default(), SelectionAction::TogglePose("pose_walking".into()), &catalog);
        assert!(state.pose_ids.is_empty());
    }

    #[test]
    fn test_toggle_incompatible_or_unknown_pose_is_noop() {
        let catalog = Catalog::builtin();
        let state = apply(
            SelectionState::default(),
            vec![
                SelectionAction::SelectModel("obj_hanger_1".into()),
                SelectionAction::TogglePose("pose_walking".into()),
                SelectionAction::TogglePose("pose_does_not_exist".into()),
            ],
            &catalog,
        );
        assert!(state.pose_ids.is_empty());
    }

    // =============================================
    // SelectModel
    // =============================================

    #[test]
    fn test_select_incompatible_model_clears_poses() {
        let catalog = Catalog::builtin();
        let state = apply(
            SelectionState::default(),
            vec![
                SelectionAction::SelectModel("model_f_1".into()),
                SelectionAction::TogglePose("pose_walking".into()),
                SelectionAction::TogglePose("pose_side".into()),
                SelectionAction::SelectModel("obj_desk_1".into()),
            ],
            &catalog,
        );
        assert_eq!(state.model_id.as_deref(), Some("obj_desk_1"));
        assert!(state.pose_ids.is_empty());
    }

    #[test]
    fn test_select_compatible_model_keeps_poses() {
        let catalog = Catalog::builtin();
        let state = apply(
            SelectionState::default(),
            vec![
                SelectionAction::SelectModel("model_f_1".into()),
                SelectionAction::TogglePose("pose_walking".into()),
                SelectionAction::TogglePose("pose_side".into()),
                SelectionAction::SelectModel("model_m_2".into()),
            ],
            &catalog,
        );
        assert_eq!(state.model_id.as_deref(), Some("model_m_2"));
        assert_eq!(state.pose_ids, vec!["pose_walking", "pose_side"]);
    }

    #[test]
    fn test_select_unknown_model_is_noop() {
        let catalog = Catalog::builtin();
        let before = ready_state(&catalog);
        let after = reduce(before.clone(), SelectionAction::SelectModel("nobody".into()), &catalog);
        assert_eq!(after, before);
    }

    #[test]
    fn test_select_unknown_setting_and_style_is_noop() {
        let catalog = Catalog::builtin();
        let before = ready_state(&catalog);
        let after = apply(
            before.clone(),
            vec![
                SelectionAction::SelectSetting("set_moon".into()),
                SelectionAction::SelectStyle("style_unknown".into()),
            ],
            &catalog,
        );
        assert_eq!(after, before);
    }

    // =============================================
    // UploadCustomModel
    // =============================================

    #[test]
    fn test_upload_custom_model_first_and_selected() {
        let catalog = Catalog::builtin();
        let state = reduce(
            SelectionState::default(),
            SelectionAction::UploadCustomModel { id: "custom_1".into(), image: image() },
            &catalog,
        );

        let models = all_models(&state, &catalog);
        assert_eq!(models.len(), catalog.models.len() + 1);
        assert_eq!(models[0].id(), "custom_1");
        assert!(models[0].is_custom());
        assert_eq!(models[0].effective_mode(), PresentationMode::Model);
        assert_eq!(state.model_id.as_deref(), Some("custom_1"));
        assert_eq!(active_mode(&state, &catalog), Some(PresentationMode::Model));
    }

    #[test]
    fn test_newest_custom_model_comes_first() {
        let catalog = Catalog::builtin();
        let state = apply(
            SelectionState::default(),
            vec![
                SelectionAction::UploadCustomModel { id: "custom_1".into(), image: image() },
                SelectionAction::UploadCustomModel { id: "custom_2".into(), image: image() },
            ],
            &catalog,
        );
        let models = all_models(&state, &catalog);
        assert_eq!(models[0].id(), "custom_2");
        assert_eq!(models[1].id(), "custom_1");
    }

    #[test]
    fn test_upload_custom_model_clears_object_poses() {
        let catalog = Catalog::builtin();
        let state = apply(
            SelectionState::default(),
            vec![
                SelectionAction::SelectModel("obj_hanger_1".into()),
                SelectionAction::TogglePose("pose_flat_straight".into()),
                SelectionAction::UploadCustomModel { id: "custom_1".into(), image: image() },
            ],
            &catalog,
        );
        assert!(state.pose_ids.is_empty());
    }

    // =============================================
    // can_generate
    // =============================================

    #[test]
    fn test_can_generate_when_complete() {
        let catalog = Catalog::builtin();
        assert!(can_generate(&ready_state(&catalog)));
    }

    #[test]
    fn test_can_generate_false_when_one_field_missing() {
        let catalog = Catalog::builtin();
        let ready = ready_state(&catalog);

        let mut state = ready.clone();
        state.source_image = None;
        assert!(!can_generate(&state));

        let mut state = ready.clone();
        state.model_id = None;
        assert!(!can_generate(&state));

        let mut state = ready.clone();
        state.pose_ids.clear();
        assert!(!can_generate(&state));

        let mut state = ready.clone();
        state.setting_id = None;
        assert!(!can_generate(&state));

        let mut state = ready;
        state.style_id = None;
        assert!(!can_generate(&state));
    }

    #[test]
    fn test_can_generate_false_after_untoggling_last_pose() {
        let catalog = Catalog::builtin();
        let state = reduce(ready_state(&catalog), SelectionAction::TogglePose("pose_walking".into()), &catalog);
        assert!(!can_generate(&state));
    }

    // =============================================
    // available_poses
    // =============================================

    #[test]
    fn test_available_poses_without_model_are_inert() {
        let catalog = Catalog::builtin();
        let availability = available_poses(&SelectionState::default(), &catalog);
        assert!(availability.inert);
        assert_eq!(availability.poses.len(), catalog.poses.len());
    }

    #[test]
    fn test_available_poses_filtered_by_mode() {
        let catalog = Catalog::builtin();
        let state = reduce(SelectionState::default(), SelectionAction::SelectModel("obj_desk_1".into()), &catalog);
        let availability = available_poses(&state, &catalog);
        assert!(!availability.inert);
        let ids: Vec<&str> = availability.poses.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["pose_flat_straight", "pose_wrinkled_art"]);
    }

    // =============================================
    // Reset
    // =============================================

    #[test]
    fn test_reset_clears_everything() {
        let catalog = Catalog::builtin();
        let state = reduce(
            ready_state(&catalog),
            SelectionAction::UploadCustomModel { id: "custom_1".into(), image: image() },
            &catalog,
        );
        let state = reduce(state, SelectionAction::Reset { keep_custom_models: false }, &catalog);
        assert_eq!(state, SelectionState::default());
    }

    #[test]
    fn test_reset_can_keep_custom_models() {
        let catalog = Catalog::builtin();
        let state = reduce(
            ready_state(&catalog),
            SelectionAction::UploadCustomModel { id: "custom_1".into(), image: image() },
            &catalog,
        );
        let state = reduce(state, SelectionAction::Reset { keep_custom_models: true }, &catalog);
        assert_eq!(state.custom_models.len(), 1);
        assert!(state.model_id.is_none());
        assert!(state.source_image.is_none());
        assert!(state.pose_ids.is_empty());
        assert!(state.setting_id.is_none());
        assert!(state.style_id.is_none());
    }
}
