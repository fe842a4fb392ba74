/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化日志
///
/// 优先使用 `RUST_LOG`，否则根据 `verbose` 选择 debug / info
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 测试中可能被多次调用，忽略重复初始化
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 LeetCode Tracker 启动 - {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    if config.headless {
        info!("🌐 浏览器模式: 无头启动");
    } else {
        info!("🌐 浏览器模式: 连接调试端口 {}", config.browser_debug_port);
    }
    info!("💾 状态文件: {}", config.state_file);
    info!("⏱️ 冷却时间: {} 秒", config.cooldown_secs);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("abc", 5), "abc");
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        // 按字符而不是字节截断
        assert_eq!(truncate_text("提交失败了", 2), "提交...");
    }
}
