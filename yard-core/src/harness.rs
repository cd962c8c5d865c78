//! HTML page that instantiates a compiled module in the browser.

use crate::compiler::{CompilationArtifact, HostImport};

/// Renders a standalone page embedding `artifact` that links its host
/// imports under `env` and calls `entry` once instantiated.
pub fn render_html(artifact: &CompilationArtifact, entry: &str) -> String {
    let mut page = String::from("<!DOCTYPE html>\n<html>\n<body>\n<script>\n");

    page.push_str("var wasm = ");
    page.push_str(&byte_array(&artifact.wasm));
    page.push_str(";\n");

    page.push_str("var importObject = {env:{");
    for import in &artifact.imports {
        page.push_str(&import_entry(import));
    }
    page.push_str("}};\n");

    page.push_str(&format!(
        "WebAssembly.instantiate(Uint8Array.from(wasm), importObject).then(\n    \
         (obj) => {{\n        obj.instance.exports.{entry}();\n    }}\n);\n"
    ));
    page.push_str("</script>\n</body>\n</html>\n");
    page
}

fn byte_array(bytes: &[u8]) -> String {
    let items: Vec<String> = bytes.iter().map(|b| format!("0x{b:02X}")).collect();
    format!("[{}]", items.join(","))
}

/// `Name:(a,b)=>{body},` followed by a newline.
fn import_entry(import: &HostImport) -> String {
    let parameters: Vec<&str> = import.parameters.iter().map(|p| p.name.as_str()).collect();
    format!(
        "{}:({})=>{{{}}},\n",
        import.name,
        parameters.join(","),
        import.body
    )
}
