//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `LIAN__*` 覆盖（双下划线表示嵌套，如 `LIAN__LLM__PROVIDER=openai`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub chat: ChatSection,
    #[serde(default)]
    pub evaluator: EvaluatorSection,
}

/// [app] 段：应用名、对话轮数上限
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    /// 对话历史保留轮数（短期记忆）
    #[serde(default = "default_max_context_turns")]
    pub max_context_turns: usize,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            max_context_turns: default_max_context_turns(),
        }
    }
}

fn default_max_context_turns() -> usize {
    20
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmSection {
    /// 后端：deepseek / openai；优先级由 API Key 与 provider 共同决定
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub deepseek: LlmDeepSeekSection,
    #[serde(default)]
    pub openai: LlmOpenAiSection,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmDeepSeekSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmOpenAiSection {
    pub model: Option<String>,
}

/// [llm.timeouts] 段：对话请求与关系评估各自的超时（秒）
#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    #[serde(default = "default_request_timeout")]
    pub request: u64,
    #[serde(default = "default_evaluation_timeout")]
    pub evaluation: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
            evaluation: default_evaluation_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

fn default_evaluation_timeout() -> u64 {
    30
}

/// [chat] 段：闲聊回复的采样参数与分段显示开关
#[derive(Debug, Clone, Deserialize)]
pub struct ChatSection {
    #[serde(default = "default_chat_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_chat_temperature")]
    pub temperature: f32,
    /// 回复按 </> 分段、带打字延迟逐条显示
    #[serde(default = "default_segmented_replies")]
    pub segmented_replies: bool,
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            max_tokens: default_chat_max_tokens(),
            temperature: default_chat_temperature(),
            segmented_replies: default_segmented_replies(),
        }
    }
}

fn default_chat_max_tokens() -> u32 {
    500
}

fn default_chat_temperature() -> f32 {
    0.95
}

fn default_segmented_replies() -> bool {
    true
}

/// [evaluator] 段：关系评估的采样参数（低温度短输出）
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluatorSection {
    #[serde(default = "default_eval_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_eval_temperature")]
    pub temperature: f32,
}

impl Default for EvaluatorSection {
    fn default() -> Self {
        Self {
            max_tokens: default_eval_max_tokens(),
            temperature: default_eval_temperature(),
        }
    }
}

fn default_eval_max_tokens() -> u32 {
    200
}

fn default_eval_temperature() -> f32 {
    0.3
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            llm: LlmSection::default(),
            chat: ChatSection::default(),
            evaluator: EvaluatorSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 LIAN__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 LIAN__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("LIAN")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
