use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;

fn hash_file(path: &Path) -> String {
    let content = fs::read(path).unwrap_or_default();
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:016x}", hasher.finish())[..8].to_string()
}

fn main() {
    // Re-run build script if assets or templates change
    println!("cargo:rerun-if-changed=static/css/styles.css");
    println!("cargo:rerun-if-changed=static/js/socios.js");
    println!("cargo:rerun-if-changed=templates/");

    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    let manifest_dir = Path::new(&manifest_dir);

    // Hash static assets for cache busting
    let css_hash = hash_file(&manifest_dir.join("static/css/styles.css"));
    let js_hash = hash_file(&manifest_dir.join("static/js/socios.js"));

    // Write generated code to OUT_DIR
    let out_dir = std::env::var("OUT_DIR").expect("OUT_DIR not set");
    fs::write(
        Path::new(&out_dir).join("asset_hashes.rs"),
        format!(
            r#"/// Hash of styles.css for cache busting
pub const STYLES_CSS_HASH: &str = "{}";
/// Hash of socios.js for cache busting
pub const SOCIOS_JS_HASH: &str = "{}";"#,
            css_hash, js_hash
        ),
    )
    .expect("Failed to write asset hashes");
}
