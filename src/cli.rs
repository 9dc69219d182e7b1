use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hinban-ai")]
#[command(about = "カタログPDF品番照合ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// PDFからトークンを抽出して品番DBと照合
    Match {
        /// PDF・テキストファイル、またはそれらを含むフォルダ
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// 品番DB（CSV/Excel、hinban・kidou列必須）
        #[arg(short, long)]
        db: PathBuf,

        /// 出力フォルダ（デフォルト: カレント）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 出力形式 (csv/excel/both)
        #[arg(short, long, default_value = "csv")]
        format: ExportFormat,

        /// 全ページをOCRで読む（ocr_command の設定が必要）
        #[arg(long)]
        force_ocr: bool,

        /// ページテキストキャッシュを使用（出力フォルダに保存）
        #[arg(long)]
        use_cache: bool,

        /// サブフォルダも再帰的にスキャン
        #[arg(short = 'r', long)]
        recursive: bool,
    },

    /// 未一致トークンを品番DBで再照合
    Retry {
        /// 品番DB（CSV/Excel）
        #[arg(short, long)]
        db: PathBuf,

        /// 再照合するトークン（省略時は対話モード）
        tokens: Vec<String>,

        /// 対話モードで読み込む failure.csv（またはそのフォルダ）
        #[arg(long)]
        failures: Option<PathBuf>,
    },

    /// LLMで品番候補を抽出して照合（失敗時は正規表現にフォールバック）
    Semantic {
        /// 入力PDF（またはテキスト）
        #[arg(long)]
        pdf: PathBuf,

        /// 品番DB（CSV/Excel）
        #[arg(long)]
        db: PathBuf,

        /// モデル名
        #[arg(long)]
        model: Option<String>,

        /// OpenAI互換APIのベースURL
        #[arg(long)]
        base_url: Option<String>,

        /// APIキー
        #[arg(long)]
        api_key: Option<String>,

        /// タイムアウト秒
        #[arg(long)]
        timeout: Option<u64>,

        /// あいまい一致の閾値（0.0-1.0）
        #[arg(long)]
        fuzzy_threshold: Option<f64>,

        /// 抽出・照合結果を logs/ にCSV保存
        #[arg(long)]
        save: bool,

        /// ログ保存先（デフォルト: logs）
        #[arg(long, default_value = "logs")]
        log_dir: PathBuf,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// OpenAI互換APIのベースURLを設定
        #[arg(long)]
        set_base_url: Option<String>,

        /// モデルを設定
        #[arg(long)]
        set_model: Option<String>,

        /// OCRコマンドを設定（空白区切り、PDFパスは末尾に付加される）
        #[arg(long)]
        set_ocr_command: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },

    /// キャッシュ管理
    Cache {
        /// キャッシュを削除
        #[arg(long)]
        clear: bool,

        /// 対象フォルダ（省略時はカレント）
        #[arg(short, long)]
        folder: Option<PathBuf>,

        /// キャッシュ情報を表示
        #[arg(long)]
        info: bool,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Excel,
    Both,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            "both" => Ok(ExportFormat::Both),
            _ => Err(format!("Unknown format: {}. Use csv, excel, or both", s)),
        }
    }
}
