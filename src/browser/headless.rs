use std::path::Path;

use anyhow::Result;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::AppError;

/// 启动无头浏览器并导航到指定 URL
///
/// `chrome_executable` 为空时由 chromiumoxide 自行查找本机浏览器。
pub async fn launch_headless_browser(url: &str, chrome_executable: Option<&str>) -> Result<(Browser, Page)> {
    info!("🚀 启动无头浏览器...");
    debug!("目标 URL: {}, 可执行文件: {:?}", url, chrome_executable);

    let mut builder = BrowserConfig::builder().new_headless_mode().args(vec![
        "--disable-gpu",
        "--no-sandbox",
        "--disable-dev-shm-usage",
    ]);
    if let Some(executable) = chrome_executable {
        builder = builder.chrome_executable(Path::new(executable));
    }

    let config = builder.build().map_err(|e| {
        error!("配置无头浏览器失败: {}", e);
        AppError::browser_launch_failed(e)
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动无头浏览器失败: {}", e);
        AppError::browser_launch_failed(e)
    })?;
    debug!("无头浏览器启动成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser.new_page(url).await.map_err(|e| {
        error!("创建页面失败: {}", e);
        anyhow::anyhow!("创建页面失败: {}", e)
    })?;

    info!("✅ 无头浏览器已导航到: {}", url);
    Ok((browser, page))
}
