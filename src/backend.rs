/// Browser tab primitives consumed by the engine
use crate::error::BackendError;
use crate::tab_data::{TabId, TabRef, WindowId};
use wasm_bindgen::prelude::*;

// Import JS bridge functions
#[wasm_bindgen(module = "/js/tabs_bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn queryAllTabs() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn removeTabs(tab_ids: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn createTab(url: &str, window_id: i32) -> Result<(), JsValue>;
}

/// The three point operations the engine needs from the browser.
/// Each call either completes or fails outright; the engine does not retry.
#[allow(async_fn_in_trait)]
pub trait TabBackend {
    /// Every open tab, across all windows
    async fn query_tabs(&self) -> Result<Vec<TabRef>, BackendError>;

    async fn remove_tabs(&self, ids: &[TabId]) -> Result<(), BackendError>;

    /// Open `url` in `window_id` without activating it
    async fn create_tab(&self, url: &str, window_id: WindowId) -> Result<(), BackendError>;
}

/// `chrome.tabs` through the JS bridge
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeTabs;

impl TabBackend for ChromeTabs {
    async fn query_tabs(&self) -> Result<Vec<TabRef>, BackendError> {
        let tabs_js = queryAllTabs().await.map_err(js_error)?;
        serde_wasm_bindgen::from_value(tabs_js)
            .map_err(|e| BackendError::new(format!("Failed to parse tabs: {:?}", e)))
    }

    async fn remove_tabs(&self, ids: &[TabId]) -> Result<(), BackendError> {
        let tab_ids_js = serde_wasm_bindgen::to_value(ids)
            .map_err(|e| BackendError::new(format!("Failed to serialize: {:?}", e)))?;
        removeTabs(tab_ids_js).await.map_err(js_error)
    }

    async fn create_tab(&self, url: &str, window_id: WindowId) -> Result<(), BackendError> {
        createTab(url, window_id).await.map_err(js_error)
    }
}

fn js_error(e: JsValue) -> BackendError {
    let message = e
        .as_string()
        .or_else(|| {
            js_sys::Reflect::get(&e, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{:?}", e));
    BackendError::new(message)
}
