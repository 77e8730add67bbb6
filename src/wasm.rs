use crate::processor::IdPolicy;
use crate::GenerateOptions;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub fn generate_extension_source(config_json: &str) -> Result<String, JsValue> {
    generate_extension_source_with_options(config_json, false)
}

#[wasm_bindgen]
pub fn generate_extension_source_with_options(
    config_json: &str,
    random_ids: bool,
) -> Result<String, JsValue> {
    let options = GenerateOptions {
        id_policy: if random_ids {
            IdPolicy::Random
        } else {
            IdPolicy::Deterministic
        },
    };
    crate::generate_from_str(config_json, options)
        .map(|module| module.source)
        .map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}
