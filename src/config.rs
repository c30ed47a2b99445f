use std::str::FromStr;

/// 传输方式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportKind {
    /// 写入本地目录
    Local,
    /// PUT 到 HTTP 存储后端
    Http,
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(TransportKind::Local),
            "http" => Ok(TransportKind::Http),
            other => Err(format!("未知的传输方式: {}", other)),
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时登记的最大任务数
    pub max_batch_size: usize,
    /// 策略表 TOML 文件
    pub policy_file: String,
    /// 待上传目录
    pub upload_folder: String,
    /// 上传类别
    pub category: String,
    /// 失败任务的重试轮数
    pub max_retries: u32,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 上传报告文件
    pub report_file: String,
    // --- 传输配置 ---
    pub transport: TransportKind,
    pub bucket_root: String,
    pub http_base_url: String,
    /// HTTP 请求超时（秒），0 表示不限制
    pub http_timeout_secs: u64,
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_batch_size: 10,
            policy_file: "policies.toml".to_string(),
            upload_folder: "uploads".to_string(),
            category: "images".to_string(),
            max_retries: 1,
            verbose_logging: false,
            report_file: "upload_report.txt".to_string(),
            transport: TransportKind::Local,
            bucket_root: "bucket_storage".to_string(),
            http_base_url: "http://localhost:9000".to_string(),
            http_timeout_secs: 300,
            chunk_size: 64 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_batch_size: std::env::var("MAX_BATCH_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_batch_size),
            policy_file: std::env::var("POLICY_FILE").unwrap_or(default.policy_file),
            upload_folder: std::env::var("UPLOAD_FOLDER").unwrap_or(default.upload_folder),
            category: std::env::var("UPLOAD_CATEGORY").unwrap_or(default.category),
            max_retries: std::env::var("MAX_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_retries),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            report_file: std::env::var("REPORT_FILE").unwrap_or(default.report_file),
            transport: std::env::var("TRANSPORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.transport),
            bucket_root: std::env::var("BUCKET_ROOT").unwrap_or(default.bucket_root),
            http_base_url: std::env::var("HTTP_BASE_URL").unwrap_or(default.http_base_url),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.http_timeout_secs),
            chunk_size: std::env::var("CHUNK_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.chunk_size),
        }
    }
}
