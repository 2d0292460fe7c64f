use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    // The app looks for config.json next to its executable.
    copy_config();
}

/// Resolves target/<profile> from OUT_DIR (target/<profile>/build/<pkg>-<hash>/out).
fn target_dir() -> Option<PathBuf> {
    let out_dir = env::var("OUT_DIR").ok()?;
    Path::new(&out_dir).ancestors().nth(3).map(Path::to_path_buf)
}

/// Copies config.json to the target directory.
fn copy_config() {
    println!("cargo:rerun-if-changed=config.json");

    let config_src = Path::new("config.json");
    if !config_src.exists() {
        return;
    }

    if let Some(target_dir) = target_dir() {
        let _ = fs::copy(config_src, target_dir.join("config.json"));
    }
}
