use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "loom-lens")]
#[command(about = "AIモックアップ撮影スタジオ（衣類画像からモデル着用写真を生成）", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 衣類画像からモックアップを生成
    Generate {
        /// 衣類画像のパス
        #[arg(required = true)]
        cloth: PathBuf,

        /// モデルID（`loom-lens catalog` で一覧表示）
        #[arg(short, long, required_unless_present = "custom_model")]
        model: Option<String>,

        /// 参照人物画像（カスタムモデルとして使用）
        #[arg(long, conflicts_with = "model")]
        custom_model: Option<PathBuf>,

        /// ポーズID（最大3つ、指定順に生成）
        #[arg(short, long = "pose", required = true)]
        poses: Vec<String>,

        /// 撮影場所ID
        #[arg(short, long)]
        setting: String,

        /// スタイルID
        #[arg(long)]
        style: String,

        /// 出力ディレクトリ（デフォルト: 設定の output_dir）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 生成済み画像をテキスト指示で編集
    Edit {
        /// 編集元の画像
        #[arg(required = true)]
        image: PathBuf,

        /// 編集指示（例: "背景を夕焼けに"）
        #[arg(short, long)]
        instruction: String,

        /// 出力ディレクトリ
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// カタログ（モデル・ポーズ・撮影場所・スタイル）を表示
    Catalog {
        /// JSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 対話式スタジオを起動
    Studio {
        /// 保存先ディレクトリ
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 設定
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
