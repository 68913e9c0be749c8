use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub fn compile_block_json(source: &str, model: &str, serial: &str) -> Result<String, JsValue> {
    let instrumented = crate::compile_json(source, model, serial)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    let out = serde_json::json!({
        "sourceText": instrumented.source_text,
        "guardFunctionName": instrumented.guard_function_name,
    });
    Ok(out.to_string())
}
