//! ログ初期化
//!
//! 進捗表示は stdout（println!・プログレスバー）、診断ログは stderr に分ける。

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// `--verbose` に応じた既定フィルタ（RUST_LOG があればそちらを優先）
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "warn,hinban_ai_rust=debug,hinban_ai_common=debug"
    } else {
        "warn,hinban_ai_rust=info,hinban_ai_common=info"
    }
}

/// tracing サブスクライバを初期化
pub fn init_logging(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose)
                .with_line_number(verbose),
        )
        .try_init();

    if let Err(e) = result {
        eprintln!("ログ初期化に失敗しました: {}", e);
    }
}
