use thiserror::Error;

#[derive(Error, Debug)]
pub enum HinbanAiError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。`hinban-ai config --set-api-key YOUR_KEY` または環境変数 OPENAI_API_KEY で設定してください")]
    MissingApiKey,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("PDF・テキストが見つかりません: {0}")]
    NoDocumentsFound(String),

    #[error("テキスト抽出エラー: {0}")]
    Extraction(String),

    #[error("OCR処理に失敗しました: {0}")]
    Ocr(String),

    #[error("API呼び出しエラー: {0}")]
    ApiCall(String),

    #[error("Excel生成エラー: {0}")]
    Excel(String),

    #[error("CLI実行エラー: {0}")]
    CliExecution(String),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error(transparent)]
    Common(#[from] hinban_ai_common::Error),
}

pub type Result<T> = std::result::Result<T, HinbanAiError>;
