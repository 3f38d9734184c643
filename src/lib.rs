// ==================== Imports ====================
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsValue;

mod browser;
pub mod config;
pub mod engine;
pub mod game;
pub mod sim;

use engine::GameLoop;
use game::CroissantCatch;

// ==================== Main Functions ====================
/// Main entry for Webassembly module
/// - installs panic hook and logger
/// - loads tuning, fits the canvas
/// - starts the frame loop and the session clock
#[wasm_bindgen]
pub fn main_js() -> Result<(), JsValue> {
    // setup better panic messages for debugging
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info)
        .map_err(|err| JsValue::from_str(&format!("Could not start logger : {}", err)))?;

    log::info!("Croissant Catch starting...");

    // spawns a new asynchronous task in local thread, for web assembly
    // environment, using wasm_bindgen_futures
    browser::spawn_local(async move {
        if let Err(err) = GameLoop::start(CroissantCatch::new()).await {
            log::error!("Could not start game : {:#}", err);
        }
    });

    Ok(())
}
