pub mod dom_probe;
pub mod js_executor;

#[cfg(test)]
pub mod fake;

pub use dom_probe::{DocumentHost, DomProbe, FrameHost, HiddenDocument, HiddenDocumentGuard, PageProbe};
pub use js_executor::JsExecutor;
