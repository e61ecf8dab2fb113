use thiserror::Error;

#[derive(Error, Debug)]
pub enum StudioError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。GEMINI_API_KEY を設定するか `loom-lens config --set-api-key YOUR_KEY` で設定してください")]
    MissingApiKey,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("API呼び出しエラー: {0}")]
    ApiCall(String),

    #[error("APIレスポンスのパースに失敗: {0}")]
    ApiParse(String),

    #[error("画像が生成されませんでした: {0}")]
    NoImageReturned(String),

    #[error(transparent)]
    Common(#[from] loom_lens_common::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("画像処理エラー: {0}")]
    ImageCodec(#[from] image::ImageError),

    #[error("入力エラー: {0}")]
    Prompt(#[from] dialoguer::Error),
}

pub type Result<T> = std::result::Result<T, StudioError>;
