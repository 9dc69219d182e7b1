//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use hinban_ai_rust::config::{Config, LlmOverrides};
use hinban_ai_rust::error::HinbanAiError;
use hinban_ai_rust::reference_source::load_reference;
use hinban_ai_rust::{retry, scanner};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// 存在しないフォルダをスキャンした場合
#[test]
fn test_scan_nonexistent_folder() {
    let result = scanner::scan_folder(Path::new("/nonexistent/path/12345"), false);
    assert!(matches!(result, Err(HinbanAiError::FolderNotFound(_))));
}

/// 空のフォルダはエラーではなく空のVec
#[test]
fn test_scan_empty_folder() {
    let dir = tempdir().expect("Failed to create temp dir");
    let result = scanner::scan_folder(dir.path(), false).unwrap();
    assert!(result.is_empty());
}

/// 対象外のファイルと隠しファイルは無視
#[test]
fn test_scan_folder_filters() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("b.pdf"), "x").unwrap();
    std::fs::write(dir.path().join("a.TXT"), "x").unwrap();
    std::fs::write(dir.path().join("data.json"), "{}").unwrap();
    std::fs::write(dir.path().join(".text-cache.json"), "{}").unwrap();
    std::fs::write(dir.path().join(".hidden.pdf"), "x").unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("sub").join("c.pdf"), "x").unwrap();

    let names = |paths: Vec<PathBuf>| -> Vec<String> {
        paths
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect()
    };

    assert_eq!(names(scanner::scan_folder(dir.path(), false).unwrap()), vec!["a.TXT", "b.pdf"]);
    assert_eq!(
        names(scanner::scan_folder(dir.path(), true).unwrap()),
        vec!["a.TXT", "b.pdf", "sub/c.pdf"]
    );
}

/// 入力の混在と重複
#[test]
fn test_collect_documents() {
    let dir = tempdir().expect("Failed to create temp dir");
    let a = dir.path().join("a.pdf");
    std::fs::write(&a, "x").unwrap();

    let docs = scanner::collect_documents(&[a.clone(), dir.path().to_path_buf()], false).unwrap();
    assert_eq!(docs, vec![a]);

    let missing = scanner::collect_documents(&[dir.path().join("missing.pdf")], false);
    assert!(matches!(missing, Err(HinbanAiError::FileNotFound(_))));

    let docx = dir.path().join("a.docx");
    std::fs::write(&docx, "x").unwrap();
    let unsupported = scanner::collect_documents(&[docx], false);
    assert!(matches!(unsupported, Err(HinbanAiError::Extraction(_))));
}

/// 品番DBの読み込みエラー
#[test]
fn test_load_reference_errors() {
    let dir = tempdir().expect("Failed to create temp dir");

    let missing = load_reference(&dir.path().join("db.csv"));
    assert!(matches!(missing, Err(HinbanAiError::FileNotFound(_))));

    let no_columns = dir.path().join("bad.csv");
    std::fs::write(&no_columns, "part,spec\nAB100,x\n").unwrap();
    let result = load_reference(&no_columns);
    assert!(matches!(
        result,
        Err(HinbanAiError::Common(hinban_ai_common::Error::Schema(_)))
    ));

    let broken_excel = dir.path().join("db.xlsx");
    std::fs::write(&broken_excel, "not a workbook").unwrap();
    assert!(matches!(load_reference(&broken_excel), Err(HinbanAiError::Excel(_))));
}

/// BOM付きCSVも読める
#[test]
fn test_load_reference_with_bom() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("db.csv");
    std::fs::write(&path, "\u{feff}hinban,kidou,zaiku\nAB100,LED,3\n").unwrap();

    let index = load_reference(&path).unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index.get("AB100").and_then(|r| r.stock.clone()).as_deref(), Some("3"));
}

/// 未一致ファイルの読み込みエラー
#[test]
fn test_load_failed_tokens_errors() {
    let dir = tempdir().expect("Failed to create temp dir");

    assert!(retry::load_failed_tokens(&dir.path().join("missing.csv")).is_err());

    let no_token = dir.path().join("failure.csv");
    std::fs::write(&no_token, "pdf_name,page\r\na.pdf,1\r\n").unwrap();
    assert!(matches!(
        retry::load_failed_tokens(&no_token),
        Err(HinbanAiError::Config(_))
    ));
}

/// APIキーがどこにもなければエラー
#[test]
fn test_missing_api_key() {
    let config = Config::default();
    let result = config.resolve_llm_with(&LlmOverrides::default(), |_| None);
    assert!(matches!(result, Err(HinbanAiError::MissingApiKey)));
}

/// タイムアウトの環境変数が数値でなければエラー
#[test]
fn test_invalid_timeout_env() {
    let config = Config::default();
    let overrides = LlmOverrides {
        api_key: Some("sk-test".into()),
        ..LlmOverrides::default()
    };
    let result = config.resolve_llm_with(&overrides, |name| {
        (name == "OPENAI_TIMEOUT").then(|| "soon".to_string())
    });
    assert!(matches!(result, Err(HinbanAiError::Config(_))));
}

/// HinbanAiErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        HinbanAiError::Config("テスト設定エラー".to_string()),
        HinbanAiError::MissingApiKey,
        HinbanAiError::FileNotFound("catalog.pdf".to_string()),
        HinbanAiError::FolderNotFound("/path/to/folder".to_string()),
        HinbanAiError::NoDocumentsFound("フォルダ".to_string()),
        HinbanAiError::Extraction("抽出エラー".to_string()),
        HinbanAiError::Ocr("OCRエラー".to_string()),
        HinbanAiError::ApiCall("API呼び出し失敗".to_string()),
        HinbanAiError::Excel("Excel生成エラー".to_string()),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラー表示が空: {:?}", err);
    }
}

/// 共通クレートのエラーはそのまま表示
#[test]
fn test_common_error_transparent() {
    let err: HinbanAiError = hinban_ai_common::Error::Schema("列がありません".into()).into();
    assert_eq!(err.to_string(), "Schema error: 列がありません");
}

/// IOエラーからの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: HinbanAiError = io_err.into();
    assert!(matches!(err, HinbanAiError::Io(_)));
    assert!(err.to_string().contains("file not found"));
}
