//! 対話式スタジオ
//!
//! 画面状態（View）ごとにメニューを出し、Studio の操作を呼ぶ。

use std::path::Path;

use dialoguer::{Input, Select};
use loom_lens_common::selection::{all_models, selected_model};
use loom_lens_common::{available_poses, can_generate, SelectionAction, View, MAX_POSES};

use crate::dispatch::ImageSynthesizer;
use crate::download;
use crate::error::Result;
use crate::intake;
use crate::progress::LoadingIndicator;
use crate::studio::{GenerationSummary, Studio};

pub const GENERATION_FAILED_NOTICE: &str = "モックアップの生成に失敗しました。もう一度お試しください。";
pub const EDIT_FAILED_NOTICE: &str = "画像の編集に失敗しました。もう一度お試しください。";

/// スピナー表示付きで生成
pub async fn generate_with_progress<S: ImageSynthesizer>(studio: &mut Studio<S>) -> Result<GenerationSummary> {
    let indicator = LoadingIndicator::start();
    let result = studio
        .generate(|idx, total, name| indicator.set_task(idx, total, name))
        .await;
    indicator.finish();
    result
}

pub fn print_summary(summary: &GenerationSummary) {
    println!("✔ {}枚のモックアップを生成（{}ポーズ）", summary.produced, summary.poses);
    if summary.failed_poses > 0 {
        println!("⚠ {}ポーズの生成に失敗しました（詳細はログを参照）", summary.failed_poses);
    }
}

#[derive(Clone, Copy)]
enum ConfigureAction {
    Model,
    CustomModel,
    Pose,
    Setting,
    Style,
    ReplaceSource,
    Generate,
    Reset,
    Quit,
}

#[derive(Clone, Copy)]
enum ReviewAction {
    Edit,
    SaveAll,
    SaveOne,
    BackToStudio,
    Reset,
    Quit,
}

/// 対話セッションを実行（終了を選ぶまで続く）
pub async fn run_studio<S: ImageSynthesizer>(studio: &mut Studio<S>, output_dir: &Path) -> Result<()> {
    println!("🧵 loom-lens - バーチャル撮影スタジオ\n");

    loop {
        let keep_going = match studio.view() {
            View::Idle => idle_screen(studio)?,
            View::Configuring => configure_screen(studio).await?,
            View::Reviewing => review_screen(studio, output_dir)?,
            View::Editing => edit_screen(studio).await?,
            // 生成は configure_screen 内で完了まで待つ
            View::Dispatching => true,
        };

        if !keep_going {
            println!("\n終了します");
            return Ok(());
        }
    }
}

fn idle_screen<S: ImageSynthesizer>(studio: &mut Studio<S>) -> Result<bool> {
    println!("衣類画像をアップロードしてください（対応形式: {}）", intake::supported_formats_label());
    let Some(input) = ask_image_input("衣類画像のパスまたはData URL（空欄で終了）")? else {
        return Ok(false);
    };

    match intake::load_image_input(&input) {
        Ok(image) => {
            studio.upload_source(image)?;
            println!("✔ 衣類画像を読み込みました\n");
        }
        Err(e) => println!("✖ {}\n", e),
    }
    Ok(true)
}

async fn configure_screen<S: ImageSynthesizer>(studio: &mut Studio<S>) -> Result<bool> {
    print_selection(studio);

    let ready = can_generate(studio.workflow().selection());
    let mut actions = vec![
        ("モデルを選択", ConfigureAction::Model),
        ("カスタムモデルをアップロード", ConfigureAction::CustomModel),
        ("ポーズを切り替え", ConfigureAction::Pose),
        ("撮影場所を選択", ConfigureAction::Setting),
        ("スタイルを選択", ConfigureAction::Style),
        ("衣類画像を差し替え", ConfigureAction::ReplaceSource),
    ];
    if ready {
        actions.push(("▶ 生成する", ConfigureAction::Generate));
    }
    actions.push(("リセット", ConfigureAction::Reset));
    actions.push(("終了", ConfigureAction::Quit));

    match choose("操作を選択", &actions)? {
        ConfigureAction::Model => {
            let selection = studio.workflow().selection();
            let models = all_models(selection, studio.catalog());
            let items: Vec<(String, String)> = models
                .iter()
                .map(|m| (format!("{} - {} [{}]", m.info.name, m.info.description, m.effective_mode()), m.id().to_string()))
                .collect();
            let id = choose_owned("モデル", items)?;
            studio.apply(SelectionAction::SelectModel(id))?;
        }
        ConfigureAction::CustomModel => {
            if let Some(input) = ask_image_input("参照人物画像のパスまたはData URL（空欄で戻る）")? {
                match intake::load_image_input(&input) {
                    Ok(image) => {
                        studio.upload_custom_model(image)?;
                        println!("✔ カスタムモデルを追加して選択しました");
                    }
                    Err(e) => println!("✖ {}", e),
                }
            }
        }
        ConfigureAction::Pose => toggle_pose(studio)?,
        ConfigureAction::Setting => {
            let items = studio
                .catalog()
                .settings
                .iter()
                .map(|s| (format!("{} - {}", s.info.name, s.info.description), s.id().to_string()))
                .collect();
            let id = choose_owned("撮影場所", items)?;
            studio.apply(SelectionAction::SelectSetting(id))?;
        }
        ConfigureAction::Style => {
            let items = studio
                .catalog()
                .styles
                .iter()
                .map(|s| (format!("{} - {}", s.info.name, s.info.description), s.id().to_string()))
                .collect();
            let id = choose_owned("スタイル", items)?;
            studio.apply(SelectionAction::SelectStyle(id))?;
        }
        ConfigureAction::ReplaceSource => {
            if let Some(input) = ask_image_input("衣類画像のパスまたはData URL（空欄で戻る）")? {
                match intake::load_image_input(&input) {
                    Ok(image) => studio.upload_source(image)?,
                    Err(e) => println!("✖ {}", e),
                }
            }
        }
        ConfigureAction::Generate => match generate_with_progress(studio).await {
            Ok(summary) => print_summary(&summary),
            Err(e) => {
                tracing::error!(error = %e, "generation failed");
                println!("✖ {}", GENERATION_FAILED_NOTICE);
            }
        },
        ConfigureAction::Reset => studio.reset(),
        ConfigureAction::Quit => return Ok(false),
    }
    println!();
    Ok(true)
}

fn toggle_pose<S: ImageSynthesizer>(studio: &mut Studio<S>) -> Result<()> {
    let selection = studio.workflow().selection();
    let availability = available_poses(selection, studio.catalog());
    if availability.inert {
        println!("⚠ 先にモデルを選択してください");
        return Ok(());
    }

    let items: Vec<(String, String)> = availability
        .poses
        .iter()
        .map(|p| {
            let mark = if selection.pose_ids.iter().any(|id| id == p.id()) { "[x]" } else { "[ ]" };
            (format!("{} {} - {}", mark, p.info.name, p.info.description), p.id().to_string())
        })
        .collect();

    let id = choose_owned(&format!("ポーズ（最大{}つ）", MAX_POSES), items)?;
    let before = studio.workflow().selection().pose_ids.len();
    studio.apply(SelectionAction::TogglePose(id))?;
    if studio.workflow().selection().pose_ids.len() == before {
        println!("⚠ ポーズは最大{}つまでです", MAX_POSES);
    }
    Ok(())
}

fn review_screen<S: ImageSynthesizer>(studio: &mut Studio<S>, output_dir: &Path) -> Result<bool> {
    println!("生成結果（{}枚）:", studio.results().len());
    for (idx, image) in studio.results().iter().enumerate() {
        println!("  {}. {} ({})", idx + 1, image.label(idx), image.id);
    }

    let has_results = !studio.results().is_empty();
    let mut actions = Vec::new();
    if has_results {
        actions.push(("画像を編集", ReviewAction::Edit));
        actions.push(("すべて保存", ReviewAction::SaveAll));
        actions.push(("1枚保存", ReviewAction::SaveOne));
    }
    actions.push(("スタジオに戻る（別のバリエーションを生成）", ReviewAction::BackToStudio));
    actions.push(("リセット", ReviewAction::Reset));
    actions.push(("終了", ReviewAction::Quit));

    match choose("操作を選択", &actions)? {
        ReviewAction::Edit => {
            let idx = choose_result(studio, "編集する画像")?;
            let id = studio.results()[idx].id.clone();
            studio.open_editor(&id)?;
        }
        ReviewAction::SaveAll => match download::save_all(studio.results(), output_dir) {
            Ok(paths) => println!("✔ {}枚を保存: {}", paths.len(), output_dir.display()),
            Err(e) => println!("✖ {}", e),
        },
        ReviewAction::SaveOne => {
            let idx = choose_result(studio, "保存する画像")?;
            match download::save_png(&studio.results()[idx], output_dir, idx + 1) {
                Ok(path) => println!("✔ 保存: {}", path.display()),
                Err(e) => println!("✖ {}", e),
            }
        }
        ReviewAction::BackToStudio => studio.back_to_studio()?,
        ReviewAction::Reset => studio.reset(),
        ReviewAction::Quit => return Ok(false),
    }
    println!();
    Ok(true)
}

async fn edit_screen<S: ImageSynthesizer>(studio: &mut Studio<S>) -> Result<bool> {
    if let Some(session) = studio.workflow().editing() {
        println!("編集: {}", session.target.id);
    }

    let instruction: String = Input::new()
        .with_prompt("編集指示（例: 背景を夕焼けに / 空欄で閉じる）")
        .allow_empty(true)
        .interact_text()?;

    if instruction.trim().is_empty() {
        studio.cancel_edit()?;
        return Ok(true);
    }

    studio.set_edit_instruction(instruction)?;

    let indicator = LoadingIndicator::start();
    let result = studio.submit_edit().await;
    indicator.finish();

    match result {
        Ok(image) => println!("✔ 編集結果を先頭に追加しました ({})\n", image.id),
        Err(e) => {
            tracing::error!(error = %e, "edit failed");
            println!("✖ {}\n", EDIT_FAILED_NOTICE);
        }
    }
    Ok(true)
}

fn print_selection<S: ImageSynthesizer>(studio: &Studio<S>) {
    let selection = studio.workflow().selection();
    let catalog = studio.catalog();
    let name_or_dash = |name: Option<&str>| name.unwrap_or("-").to_string();

    let poses: Vec<&str> = selection
        .pose_ids
        .iter()
        .filter_map(|id| catalog.pose(id).map(|p| p.info.name.as_str()))
        .collect();

    println!("現在の設定:");
    println!("  モデル: {}", name_or_dash(selected_model(selection, catalog).map(|m| m.info.name.as_str())));
    println!("  ポーズ: {}", if poses.is_empty() { "-".to_string() } else { poses.join(", ") });
    println!(
        "  撮影場所: {}",
        name_or_dash(selection.setting_id.as_deref().and_then(|id| catalog.setting(id)).map(|s| s.info.name.as_str()))
    );
    println!(
        "  スタイル: {}",
        name_or_dash(selection.style_id.as_deref().and_then(|id| catalog.style(id)).map(|s| s.info.name.as_str()))
    );
    if !studio.results().is_empty() {
        println!("  生成済み: {}枚", studio.results().len());
    }
}

fn choose<T: Copy>(prompt: &str, actions: &[(&str, T)]) -> Result<T> {
    let labels: Vec<&str> = actions.iter().map(|(label, _)| *label).collect();
    let idx = Select::new().with_prompt(prompt).items(&labels).default(0).interact()?;
    Ok(actions[idx].1)
}

fn choose_owned(prompt: &str, mut items: Vec<(String, String)>) -> Result<String> {
    let labels: Vec<&str> = items.iter().map(|(label, _)| label.as_str()).collect();
    let idx = Select::new().with_prompt(prompt).items(&labels).default(0).interact()?;
    Ok(items.swap_remove(idx).1)
}

fn choose_result<S: ImageSynthesizer>(studio: &Studio<S>, prompt: &str) -> Result<usize> {
    let labels: Vec<String> = studio
        .results()
        .iter()
        .enumerate()
        .map(|(idx, image)| format!("{}. {}", idx + 1, image.label(idx)))
        .collect();
    Ok(Select::new().with_prompt(prompt).items(&labels).default(0).interact()?)
}

fn ask_image_input(prompt: &str) -> Result<Option<String>> {
    let input: String = Input::new().with_prompt(prompt).allow_empty(true).interact_text()?;
    let trimmed = input.trim().trim_matches('"');
    Ok(if trimmed.is_empty() { None } else { Some(trimmed.to_string()) })
}
