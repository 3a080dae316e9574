pub mod assets;
pub mod wasm;

use wasm_bindgen::prelude::*;


// Use WeeAlloc instead of Rust's default allocator because it's roughly 10x smaller in size, albeit slower.
#[cfg(target_arch = "wasm32")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;


#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    // Make Rust 'panics' log to JS console
    console_error_panic_hook::set_once();

    // Route `log` output (including the archive readers' warnings) to the JS console
    wasm_logger::init(wasm_logger::Config::new(log::Level::Info));

    Ok(())
}
