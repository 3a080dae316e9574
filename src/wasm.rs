//! The JavaScript-facing side of the unpacker, used by the browser viewer.
//!
//! Each function takes the raw bytes of a file as a `Uint8Array` and hands back fresh copies; nothing is kept between
//! calls. Structural errors are thrown as JS `Error`s with the same message the Rust error displays.

use js_sys::{Array, Object, Reflect, Uint8Array};
use wasm_bindgen::prelude::*;

use psz::{ExtractedFile, UnpackError};


fn to_js_error(err: UnpackError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}


/// Turns the extracted files into an array of `{ name, data, error }` objects. `error` is `undefined` unless the file
/// is a placeholder.
fn files_to_js(files: Vec<ExtractedFile>) -> Result<Array, JsValue> {
    let array = Array::new_with_length(files.len() as u32);

    for (i, file) in files.into_iter().enumerate() {
        let obj = Object::new();
        Reflect::set(&obj, &"name".into(), &file.name.into())?;
        Reflect::set(&obj, &"data".into(), &Uint8Array::from(file.data.as_slice()))?;
        if let Some(err) = file.error {
            Reflect::set(&obj, &"error".into(), &err.to_string().into())?;
        }
        array.set(i as u32, obj.into());
    }

    Ok(array)
}


/// Removes the ZPR wrapper from a file and decompresses it.
#[wasm_bindgen(js_name = decompressWrapper)]
pub fn decompress_wrapper(data: &[u8]) -> Result<Vec<u8>, JsValue> {
    psz::decompress_wrapper(data).map_err(to_js_error)
}


/// Extracts all files from a decompressed NARC or ZARC.
#[wasm_bindgen(js_name = extractArchive)]
pub fn extract_archive(data: &[u8]) -> Result<Array, JsValue> {
    files_to_js(psz::extract_archive(data).map_err(to_js_error)?)
}


/// Extracts all files from a NARC or ZARC, decompressing it first if it is ZPR-wrapped.
#[wasm_bindgen]
pub fn unpack(data: &[u8]) -> Result<Array, JsValue> {
    files_to_js(psz::unpack(data).map_err(to_js_error)?)
}
