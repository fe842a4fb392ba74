//! JS 执行器 - 基础设施层
//!
//! 持有被跟踪的 page 资源，只暴露"执行 JS"的能力

use anyhow::{Context, Result};
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

/// JS 执行器
///
/// 职责：
/// - 持有 Page 资源（Page 内部是 Arc，clone 代价很小）
/// - 暴露 eval() 能力
/// - 不认识题目 / 提交
#[derive(Clone)]
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 执行 JS 代码并返回 JSON 结果
    ///
    /// 脚本必须返回非 null 的值（例如对象），否则 CDP 不会带回 value
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value().context("脚本没有返回值")?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }
}
