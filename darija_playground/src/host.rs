use darija_runtime::host::Host;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    fn alert(s: &str);
    fn prompt(s: &str) -> Option<String>;
    fn confirm(s: &str) -> bool;
    #[wasm_bindgen(js_namespace = Date)]
    fn now() -> f64;
    #[wasm_bindgen(js_namespace = Math)]
    fn random() -> f64;
}

/// Forwards the interactive built-ins to `window` and reads the clock
/// and random numbers from JS, since neither is available to wasm
pub struct BrowserHost;

impl Host for BrowserHost {
    fn alert(&mut self, message: &str) {
        alert(message);
    }

    fn prompt(&mut self, message: &str) -> Option<String> {
        prompt(message)
    }

    fn confirm(&mut self, message: &str) -> bool {
        confirm(message)
    }

    fn now_ms(&mut self) -> f64 {
        now()
    }

    fn random(&mut self) -> f64 {
        random()
    }
}
