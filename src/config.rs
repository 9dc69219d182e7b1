use crate::error::{HinbanAiError, Result};
use hinban_ai_common::prompts::DEFAULT_MAX_PROMPT_CHARS;
use hinban_ai_common::DEFAULT_FUZZY_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_MIN_TEXT_CHARS: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_seconds: u64,
    pub fuzzy_threshold: f64,
    pub max_prompt_chars: usize,
    /// テキストレイヤーがこの文字数未満のページがあればOCRに切り替える
    pub min_text_chars: usize,
    /// OCRコマンド（PDFパスを末尾に付けて実行、ページは\x0c区切り）
    pub ocr_command: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

/// CLIフラグで上書きされるLLM設定
#[derive(Debug, Clone, Default)]
pub struct LlmOverrides {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// 解決済みのLLM接続設定
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default_config())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| HinbanAiError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("hinban-ai").join("config.json"))
    }

    fn default_config() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: DEFAULT_MODEL.into(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
            ocr_command: None,
        }
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }

    /// LLM接続設定を解決する
    ///
    /// 優先順位: CLIフラグ → OPENAI_* 環境変数 → CUSTOM_OPENAI_* 環境変数 → 設定ファイル → 既定値
    pub fn resolve_llm(&self, overrides: &LlmOverrides) -> Result<LlmSettings> {
        self.resolve_llm_with(overrides, |name| std::env::var(name).ok())
    }

    /// 環境変数の参照元を差し替え可能な `resolve_llm`
    pub fn resolve_llm_with<F>(&self, overrides: &LlmOverrides, env: F) -> Result<LlmSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let api_key = overrides
            .api_key
            .clone()
            .or_else(|| env("OPENAI_API_KEY"))
            .or_else(|| env("CUSTOM_OPENAI_API_KEY"))
            .or_else(|| self.api_key.clone())
            .ok_or(HinbanAiError::MissingApiKey)?;

        let base_url = overrides
            .base_url
            .clone()
            .or_else(|| env("OPENAI_BASE_URL"))
            .or_else(|| env("CUSTOM_OPENAI_BASE_URL"))
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let model = overrides
            .model
            .clone()
            .or_else(|| env("OPENAI_MODEL"))
            .unwrap_or_else(|| self.model.clone());

        let timeout_seconds = match overrides.timeout_seconds {
            Some(t) => t,
            None => match env("OPENAI_TIMEOUT") {
                Some(raw) => raw.trim().parse().map_err(|_| {
                    HinbanAiError::Config(format!("OPENAI_TIMEOUT が数値ではありません: {}", raw))
                })?,
                None => self.timeout_seconds,
            },
        };

        Ok(LlmSettings {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout_seconds,
        })
    }
}

/// APIキーを表示用にマスク
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.timeout_seconds, 60);
        assert_eq!(config.fuzzy_threshold, 0.82);
        assert_eq!(config.max_prompt_chars, 8000);
        assert_eq!(config.min_text_chars, 20);
    }

    #[test]
    fn test_partial_config_json() {
        let config: Config = serde_json::from_str(r#"{"api_key": "sk-test"}"#).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.ocr_command.is_none());
    }

    #[test]
    fn test_resolve_llm_defaults() {
        let config = Config { api_key: Some("file-key".into()), ..Config::default() };
        let settings = config.resolve_llm_with(&LlmOverrides::default(), env_of(&[])).unwrap();
        assert_eq!(settings.api_key, "file-key");
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.timeout_seconds, 60);
    }

    #[test]
    fn test_resolve_llm_precedence() {
        let config = Config {
            api_key: Some("file-key".into()),
            base_url: Some("http://file/v1".into()),
            ..Config::default()
        };
        let env = env_of(&[
            ("CUSTOM_OPENAI_API_KEY", "custom-key"),
            ("CUSTOM_OPENAI_BASE_URL", "http://custom/v1/"),
            ("OPENAI_MODEL", "env-model"),
            ("OPENAI_TIMEOUT", "15"),
        ]);
        let settings = config.resolve_llm_with(&LlmOverrides::default(), &env).unwrap();
        assert_eq!(settings.api_key, "custom-key");
        assert_eq!(settings.base_url, "http://custom/v1");
        assert_eq!(settings.model, "env-model");
        assert_eq!(settings.timeout_seconds, 15);

        let overrides = LlmOverrides {
            api_key: Some("flag-key".into()),
            model: Some("flag-model".into()),
            ..Default::default()
        };
        let settings = config.resolve_llm_with(&overrides, &env).unwrap();
        assert_eq!(settings.api_key, "flag-key");
        assert_eq!(settings.model, "flag-model");
    }

    #[test]
    fn test_resolve_llm_openai_env_beats_custom() {
        let env = env_of(&[("OPENAI_API_KEY", "openai"), ("CUSTOM_OPENAI_API_KEY", "custom")]);
        let settings = Config::default().resolve_llm_with(&LlmOverrides::default(), env).unwrap();
        assert_eq!(settings.api_key, "openai");
    }

    #[test]
    fn test_resolve_llm_missing_key() {
        let result = Config::default().resolve_llm_with(&LlmOverrides::default(), env_of(&[("OPENAI_API_KEY", "  ")]));
        assert!(matches!(result, Err(HinbanAiError::MissingApiKey)));
    }

    #[test]
    fn test_resolve_llm_bad_timeout() {
        let env = env_of(&[("OPENAI_API_KEY", "k"), ("OPENAI_TIMEOUT", "soon")]);
        let result = Config::default().resolve_llm_with(&LlmOverrides::default(), env);
        assert!(matches!(result, Err(HinbanAiError::Config(_))));
    }

    #[test]
    fn test_mask_api_key() {
        assert_eq!(mask_api_key("sk-1234567890abcd"), "sk-1...abcd");
        assert_eq!(mask_api_key("short"), "*****");
    }
}
