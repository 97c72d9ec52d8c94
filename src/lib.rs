/// Auto Tab Grouper - Chrome/Firefox extension that files tabs into named,
/// colored groups driven by URL rules
/// Built with Rust + WASM + Yew

mod commands;
mod config;
mod group_index;
mod host;
mod matcher;
mod reconciler;
mod tabs;
pub mod ui;

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Start the background engine: event listeners + initialization
#[wasm_bindgen]
pub fn start_background() {
    commands::start_background();
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}

// Re-export URL normalization for the bridge scripts
#[wasm_bindgen]
pub fn extract_url_pattern(url: &str) -> String {
    matcher::extract_url_pattern(url).unwrap_or_default()
}
