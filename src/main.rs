use clap::Parser;
use hinban_ai_rust::{cli, config, error, export, extract, llm, logging, pipeline, reference_source, retry, scanner, semantic};
use cli::{Cli, Commands};
use config::{Config, LlmOverrides};
use error::{HinbanAiError, Result};
use extract::{CommandOcr, ExtractOptions, OcrEngine, TextCache};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Match { inputs, db, output, format, force_ocr, use_cache, recursive } => {
            println!("🔎 hinban-ai - 品番照合\n");

            // 1. 品番DB
            println!("[1/4] 品番DBを読み込み中...");
            let index = reference_source::load_reference(&db)?;
            println!("✔ {}行を読み込み\n", index.len());

            // 2. 文書スキャン
            println!("[2/4] 文書をスキャン中...");
            let documents = scanner::collect_documents(&inputs, recursive)?;
            println!("✔ {}件の文書を検出\n", documents.len());

            if documents.is_empty() {
                let names: Vec<String> = inputs.iter().map(|p| p.display().to_string()).collect();
                return Err(HinbanAiError::NoDocumentsFound(names.join(", ")));
            }

            // 3. 照合
            let options = ExtractOptions {
                min_text_chars: config.min_text_chars,
                force_ocr,
                ocr: ocr_engine(&config),
            };
            if force_ocr && options.ocr.is_none() {
                return Err(HinbanAiError::Config(
                    "--force-ocr には ocr_command の設定が必要です (`hinban-ai config --set-ocr-command`)".into(),
                ));
            }

            let output_dir = output.unwrap_or_else(|| PathBuf::from("."));
            let cache = use_cache.then(|| Mutex::new(TextCache::load(&output_dir)));

            println!("[3/4] 照合中...{}", if use_cache { " (キャッシュ有効)" } else { "" });
            let progress_bar = ProgressBar::new(0);
            progress_bar.set_style(
                ProgressStyle::with_template("  {bar:40.cyan/blue} {pos}/{len} ページ {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            let report = pipeline::process_documents(&index, &documents, &options, cache.as_ref(), |p| {
                progress_bar.set_length(p.total as u64);
                progress_bar.set_position(p.processed as u64);
                progress_bar.set_message(format!("({}%)", p.percent));
            });
            progress_bar.finish_and_clear();
            let report = report?;

            if let Some(cache) = cache {
                let cache = cache
                    .into_inner()
                    .map_err(|_| HinbanAiError::CliExecution("キャッシュのロックが壊れています".into()))?;
                cache.save(&output_dir)?;
            }

            println!("✔ {}ページを照合", report.pages);
            println!("  トークン: {}", report.totals.tokens);
            println!("  品番一致: {}", report.totals.hit_part_number);
            println!("  規格一致: {}", report.totals.hit_spec);
            println!("  不一致:   {}\n", report.totals.fail);

            // 4. 出力
            println!("[4/4] 結果を保存中...");
            for path in export::export_report(&report, &format, &output_dir)? {
                println!("✔ 出力: {}", path.display());
            }

            println!("\n✅ 照合完了");
        }

        Commands::Retry { db, tokens, failures } => {
            let index = reference_source::load_reference(&db)?;
            let stock_of = |part: &str| index.get(part).and_then(|r| r.stock.clone());

            if tokens.is_empty() {
                let pending = match failures {
                    Some(path) => retry::load_failed_tokens(&path)?,
                    None => Vec::new(),
                };
                if !pending.is_empty() {
                    println!("未一致トークン: {}件", pending.len());
                }
                retry::run_interactive_retry(&index, pending)?;
            } else {
                println!("🔁 再照合結果:");
                for outcome in retry::retry_tokens(&index, &tokens) {
                    retry::print_outcome(&outcome, stock_of);
                }
            }
        }

        Commands::Semantic { pdf, db, model, base_url, api_key, timeout, fuzzy_threshold, save, log_dir } => {
            println!("🧠 hinban-ai - セマンティック照合\n");

            let settings = config.resolve_llm(&LlmOverrides {
                api_key,
                base_url,
                model,
                timeout_seconds: timeout,
            })?;
            let client = llm::OpenAiClient::new(&settings).map_err(|e| HinbanAiError::ApiCall(e.to_string()))?;

            let fuzzy_threshold = fuzzy_threshold.unwrap_or(config.fuzzy_threshold);
            if !(0.0..=1.0).contains(&fuzzy_threshold) {
                return Err(HinbanAiError::Config(format!(
                    "fuzzy_threshold は0.0〜1.0で指定してください: {}",
                    fuzzy_threshold
                )));
            }

            // OCRが設定されていれば全ページOCRで読む
            let ocr = ocr_engine(&config);
            let options = semantic::SemanticOptions {
                extract: ExtractOptions {
                    min_text_chars: config.min_text_chars,
                    force_ocr: ocr.is_some(),
                    ocr,
                },
                llm: semantic::ExtractConfig {
                    max_prompt_chars: config.max_prompt_chars,
                    timeout: Duration::from_secs(settings.timeout_seconds),
                    ..Default::default()
                },
                fuzzy_threshold,
                log_dir: save.then_some(log_dir),
            };

            println!("  モデル: {} ({})", client.model(), settings.base_url);
            let report = semantic::process_semantic(&pdf, &db, &client, &options).await?;

            println!("\n✅ 完了（抽出方法: {}、候補 {}件）", report.method, report.items.len());
        }

        Commands::Config { set_api_key, set_base_url, set_model, set_ocr_command, show } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            let mut changed = false;
            if let Some(url) = set_base_url {
                config.base_url = Some(url);
                changed = true;
            }
            if let Some(model) = set_model {
                config.model = model;
                changed = true;
            }
            if let Some(command) = set_ocr_command {
                let parts: Vec<String> = command.split_whitespace().map(str::to_string).collect();
                config.ocr_command = (!parts.is_empty()).then_some(parts);
                changed = true;
            }
            if changed {
                config.save()?;
                println!("✔ 設定を保存しました: {}", Config::config_path()?.display());
            }

            if show {
                println!("設定:");
                println!("  モデル: {}", config.model);
                println!("  ベースURL: {}", config.base_url.as_deref().unwrap_or(config::DEFAULT_BASE_URL));
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  あいまい一致閾値: {}", config.fuzzy_threshold);
                println!("  プロンプト最大文字数: {}", config.max_prompt_chars);
                println!("  OCR切替文字数: {}", config.min_text_chars);
                println!(
                    "  OCRコマンド: {}",
                    config.ocr_command.as_ref().map(|c| c.join(" ")).unwrap_or_else(|| "未設定".into())
                );
                println!(
                    "  APIキー: {}",
                    config.api_key.as_deref().map(config::mask_api_key).unwrap_or_else(|| "未設定".into())
                );
            }
        }

        Commands::Cache { clear, folder, info } => {
            let target = folder.unwrap_or_else(|| PathBuf::from("."));
            let cache_path = TextCache::cache_path(&target);

            if info || !clear {
                if cache_path.exists() {
                    let cache = TextCache::load(&target);
                    println!("キャッシュ情報:");
                    println!("  パス: {}", cache_path.display());
                    println!("  件数: {}", cache.len());
                    if let Ok(meta) = std::fs::metadata(&cache_path) {
                        println!("  サイズ: {} bytes", meta.len());
                    }
                } else {
                    println!("キャッシュファイルが存在しません: {}", cache_path.display());
                }
            }

            if clear {
                match TextCache::clear(&target) {
                    Ok(true) => println!("✔ キャッシュを削除しました: {}", cache_path.display()),
                    Ok(false) => println!("キャッシュファイルが存在しません"),
                    Err(e) => println!("キャッシュ削除エラー: {}", e),
                }
            }
        }
    }

    Ok(())
}

fn ocr_engine(config: &Config) -> Option<Arc<dyn OcrEngine>> {
    let command = config.ocr_command.as_deref()?;
    let engine: Arc<dyn OcrEngine> = Arc::new(CommandOcr::from_command_line(command)?);
    Some(engine)
}
