//! テキスト抽出テスト
//!
//! lopdf でテキストレイヤー付きのPDFを作り、抽出とOCRへの切り替えを検証

use hinban_ai_rust::error::{HinbanAiError, Result};
use hinban_ai_rust::extract::{count_pages, extract_text_pages, ExtractOptions, OcrEngine};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

/// 1ページ1行のPDFを作る
fn write_pdf(path: &Path, pages: &[&str]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("PDFの保存失敗");
}

/// 呼び出し回数を数える固定応答のOCR
struct FixedOcr {
    pages: Vec<String>,
    calls: AtomicUsize,
}

impl FixedOcr {
    fn new(pages: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            pages: pages.iter().map(|p| p.to_string()).collect(),
            calls: AtomicUsize::new(0),
        })
    }
}

impl OcrEngine for FixedOcr {
    fn recognize(&self, _path: &Path) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pages.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

fn options_with(ocr: Arc<FixedOcr>, force_ocr: bool) -> ExtractOptions {
    let engine: Arc<dyn OcrEngine> = ocr;
    ExtractOptions {
        force_ocr,
        ocr: Some(engine),
        ..ExtractOptions::default()
    }
}

fn pdf_in(dir: &Path, name: &str, pages: &[&str]) -> PathBuf {
    let path = dir.join(name);
    write_pdf(&path, pages);
    path
}

/// テキストレイヤーから読む
#[test]
fn test_pdf_text_layer() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = pdf_in(
        dir.path(),
        "catalog.pdf",
        &["Downlight NNF41030 LE9 warm white", "Ceiling lamp XN100 daylight 2025"],
    );

    assert_eq!(count_pages(&path).unwrap(), 2);

    let pages = extract_text_pages(&path, &ExtractOptions::default()).unwrap();
    assert_eq!(pages.len(), 2);
    assert!(pages[0].contains("NNF41030"));
    assert!(pages[1].contains("XN100"));
}

/// 文字数が足りないページがあれば文書全体をOCR
#[test]
fn test_sparse_pdf_falls_back_to_ocr() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = pdf_in(dir.path(), "scan.pdf", &["Downlight NNF41030 LE9 warm white", "x"]);
    let ocr = FixedOcr::new(&["OCR page one AB100", "OCR page two CD200"]);

    let pages = extract_text_pages(&path, &options_with(ocr.clone(), false)).unwrap();
    assert_eq!(pages, vec!["OCR page one AB100", "OCR page two CD200"]);
    assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
}

/// 十分な文字数ならOCRは呼ばない
#[test]
fn test_dense_pdf_skips_ocr() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = pdf_in(dir.path(), "catalog.pdf", &["Downlight NNF41030 LE9 warm white"]);
    let ocr = FixedOcr::new(&["unused"]);

    let pages = extract_text_pages(&path, &options_with(ocr.clone(), false)).unwrap();
    assert!(pages[0].contains("NNF41030"));
    assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
}

/// OCR未設定なら少ないテキストのまま返す
#[test]
fn test_sparse_pdf_without_ocr() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = pdf_in(dir.path(), "scan.pdf", &["AB100"]);

    let pages = extract_text_pages(&path, &ExtractOptions::default()).unwrap();
    assert_eq!(pages.len(), 1);
    assert!(pages[0].contains("AB100"));
}

/// 強制OCR
#[test]
fn test_force_ocr() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = pdf_in(dir.path(), "catalog.pdf", &["Downlight NNF41030 LE9 warm white"]);
    let ocr = FixedOcr::new(&["from ocr"]);

    let pages = extract_text_pages(&path, &options_with(ocr.clone(), true)).unwrap();
    assert_eq!(pages, vec!["from ocr"]);
    assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);

    let options = ExtractOptions {
        force_ocr: true,
        ..ExtractOptions::default()
    };
    let result = extract_text_pages(&path, &options);
    assert!(matches!(result, Err(HinbanAiError::Ocr(_))));
}

/// 抽出済みテキストはフォームフィードでページ分割
#[test]
fn test_text_document_pages() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("catalog.txt");
    std::fs::write(&path, "page one\x0cpage two\x0c\x0cpage four\x0c").unwrap();

    let pages = extract_text_pages(&path, &ExtractOptions::default()).unwrap();
    assert_eq!(pages, vec!["page one", "page two", "", "page four"]);
    assert_eq!(count_pages(&path).unwrap(), 4);
}

/// 存在しない・対応外・壊れたファイル
#[test]
fn test_extract_errors() {
    let dir = tempdir().expect("Failed to create temp dir");
    let options = ExtractOptions::default();

    let missing = extract_text_pages(&dir.path().join("missing.pdf"), &options);
    assert!(matches!(missing, Err(HinbanAiError::FileNotFound(_))));

    let docx = dir.path().join("catalog.docx");
    std::fs::write(&docx, "x").unwrap();
    assert!(matches!(extract_text_pages(&docx, &options), Err(HinbanAiError::Extraction(_))));

    let broken = dir.path().join("broken.pdf");
    std::fs::write(&broken, "this is not a pdf").unwrap();
    assert!(matches!(extract_text_pages(&broken, &options), Err(HinbanAiError::Extraction(_))));
    assert!(count_pages(&broken).is_err());
}

/// 外部コマンドでのOCR（`sh -c 'cat "$0"'` でファイル内容をそのまま返す）
#[cfg(unix)]
#[test]
fn test_command_ocr() {
    use hinban_ai_rust::extract::CommandOcr;

    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("scan.txt");
    std::fs::write(&path, "AB100\x0cCD200\x0c").unwrap();

    let ocr = CommandOcr::new("sh", ["-c", "cat \"$0\""]);
    assert_eq!(ocr.name(), "sh");
    assert_eq!(ocr.recognize(&path).unwrap(), vec!["AB100", "CD200"]);

    let failing = CommandOcr::new("sh", ["-c", "echo boom >&2; exit 3"]);
    assert!(matches!(failing.recognize(&path), Err(HinbanAiError::Ocr(_))));

    let missing = CommandOcr::new("/nonexistent/ocr-command", Vec::<String>::new());
    assert!(matches!(missing.recognize(&path), Err(HinbanAiError::Ocr(_))));
}
