use anyhow::Context;
use clap::Parser;
use loom_lens::{cli, config, dispatch, download, gemini, intake, interactive, logging, progress, studio};
use loom_lens_common::{plan_edit, Catalog, GeneratedImage, SelectionAction};
use cli::{Cli, Commands};
use config::Config;
use gemini::GeminiClient;
use studio::Studio;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env の GEMINI_API_KEY / API_KEY を環境変数として読み込む
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::load()?;
    logging::init_logging(cli.verbose, &config.log_level);

    match cli.command {
        Commands::Generate { cloth, model, custom_model, poses, setting, style, output } => {
            println!("🧵 loom-lens - モックアップ生成\n");

            let mut studio = Studio::new(Catalog::builtin(), GeminiClient::from_config(&config));

            // 1. 画像読み込み
            println!("[1/3] 画像を読み込み中...");
            let source = intake::load_image_file(&cloth)
                .with_context(|| format!("衣類画像を読み込めません: {}", cloth.display()))?;
            studio.upload_source(source)?;

            match (custom_model, model) {
                (Some(path), _) => {
                    let reference = intake::load_image_file(&path)
                        .with_context(|| format!("参照人物画像を読み込めません: {}", path.display()))?;
                    studio.upload_custom_model(reference)?;
                }
                (None, Some(id)) => studio.apply(SelectionAction::SelectModel(id))?,
                (None, None) => {}
            }

            for pose in &poses {
                studio.apply(SelectionAction::TogglePose(pose.clone()))?;
            }
            studio.apply(SelectionAction::SelectSetting(setting))?;
            studio.apply(SelectionAction::SelectStyle(style))?;

            let selected = &studio.workflow().selection().pose_ids;
            for pose in poses.iter().filter(|p| !selected.contains(*p)) {
                println!("⚠ ポーズ {} は使用できません（未知のID・モデルと不一致・上限超過）", pose);
            }
            println!("✔ 設定完了\n");

            // 2. 生成
            println!("[2/3] 生成中...");
            let summary = interactive::generate_with_progress(&mut studio)
                .await
                .context(interactive::GENERATION_FAILED_NOTICE)?;
            interactive::print_summary(&summary);
            println!();

            // 3. 保存
            println!("[3/3] 保存中...");
            let output_dir = output.unwrap_or_else(|| config.output_dir.clone());
            let paths = download::save_all(studio.results(), &output_dir)?;
            for path in &paths {
                println!("✔ {}", path.display());
            }

            println!("\n✅ 完了");
        }

        Commands::Edit { image, instruction, output } => {
            println!("✏️ loom-lens - 画像編集\n");

            let source = intake::load_image_file(&image)
                .with_context(|| format!("画像を読み込めません: {}", image.display()))?;
            let source_id = image
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "source".to_string());
            let source = GeneratedImage::new(source_id, source, "", chrono::Utc::now().timestamp_millis());

            let plan = plan_edit(&source, &instruction)?;
            let client = GeminiClient::from_config(&config);

            let indicator = progress::LoadingIndicator::start();
            let result = dispatch::run_edit(&client, &plan).await;
            indicator.finish();
            let edited = result.context(interactive::EDIT_FAILED_NOTICE)?;

            let output_dir = output.unwrap_or_else(|| config.output_dir.clone());
            let path = download::save_png_unused(&edited, &output_dir)?;
            println!("✔ 保存: {}", path.display());
            println!("\n✅ 完了");
        }

        Commands::Catalog { json } => {
            let catalog = Catalog::builtin();
            if json {
                println!("{}", serde_json::to_string_pretty(&catalog)?);
                return Ok(());
            }

            println!("モデル:");
            for m in &catalog.models {
                println!("  {:<16} {} - {} [{}]", m.id(), m.info.name, m.info.description, m.effective_mode());
            }
            println!("\nポーズ:");
            for p in &catalog.poses {
                let modes: Vec<&str> = p.allowed_modes.iter().map(|m| m.as_str()).collect();
                println!("  {:<20} {} - {} [{}]", p.id(), p.info.name, p.info.description, modes.join("/"));
            }
            println!("\n撮影場所:");
            for s in &catalog.settings {
                println!("  {:<18} {} - {}", s.id(), s.info.name, s.info.description);
            }
            println!("\nスタイル:");
            for s in &catalog.styles {
                println!("  {:<18} {} - {}", s.id(), s.info.name, s.info.description);
            }
        }

        Commands::Studio { output } => {
            let mut studio = Studio::new(Catalog::builtin(), GeminiClient::from_config(&config))
                .keep_custom_models_on_reset(config.keep_custom_models_on_reset);
            let output_dir = output.unwrap_or_else(|| config.output_dir.clone());
            interactive::run_studio(&mut studio, &output_dir).await?;
        }

        Commands::Config { set_api_key, show } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            if show {
                println!("設定:");
                println!("  モデル: {}", config.model);
                println!("  APIエンドポイント: {}", config.api_base_url);
                println!("  出力先: {}", config.output_dir.display());
                println!("  リセット時にカスタムモデルを保持: {}", config.keep_custom_models_on_reset);
                println!("  ログレベル: {}", config.log_level);
                println!("  APIキー: {}", if config.resolve_api_key().is_some() { "設定済み" } else { "未設定" });
            }
        }
    }

    Ok(())
}
