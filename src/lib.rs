/// Duplicate Tab Remover - Chrome Extension for closing duplicate tabs
/// Built with Rust + WASM + Yew

pub mod backend;
pub mod engine;
pub mod error;
pub mod journal;
pub mod messages;
pub mod normalize;
pub mod selection;
pub mod service;
pub mod settings;
pub mod tab_data;
pub mod ui;

use wasm_bindgen::prelude::*;

pub use engine::DuplicateEngine;
pub use error::{BackendError, EngineError};
pub use normalize::{comparison_key, normalize};
pub use service::DuplicateService;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Re-export URL normalization for JavaScript access
#[wasm_bindgen]
pub fn normalize_url(url: &str) -> String {
    normalize::comparison_key(url)
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}
