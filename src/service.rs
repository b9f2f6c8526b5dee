/// Background-script entry point wrapping the engine for JavaScript
use crate::backend::ChromeTabs;
use crate::engine::DuplicateEngine;
use crate::messages::{Request, dispatch};
use js_sys::Promise;
use serde::Serialize;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

/// One engine per background context. The background script constructs it
/// once and routes every `chrome.runtime` message through [`handle`](Self::handle).
#[wasm_bindgen]
pub struct DuplicateService {
    engine: Rc<DuplicateEngine<ChromeTabs>>,
}

#[wasm_bindgen]
impl DuplicateService {
    #[wasm_bindgen(constructor)]
    pub fn new() -> DuplicateService {
        DuplicateService {
            engine: Rc::new(DuplicateEngine::new(ChromeTabs)),
        }
    }

    /// Resolves to the response object for `request`
    pub fn handle(&self, request: JsValue) -> Promise {
        let engine = Rc::clone(&self.engine);

        future_to_promise(async move {
            let request: Request = serde_wasm_bindgen::from_value(request)
                .map_err(|e| JsValue::from_str(&format!("Invalid request: {:?}", e)))?;

            let response = dispatch(&*engine, request).await;

            response
                .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
                .map_err(|e| JsValue::from_str(&format!("Failed to serialize: {:?}", e)))
        })
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.engine.can_undo()
    }
}

impl Default for DuplicateService {
    fn default() -> Self {
        Self::new()
    }
}
