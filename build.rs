//! Stamps each rebuild with a counter and a compile time

use std::fs;
use std::path::Path;

const COUNTER_FILE: &str = "build_number.txt";

fn next_build_number(path: &Path) -> u64 {
    let previous = fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(0);
    let next = previous + 1;
    if let Err(e) = fs::write(path, next.to_string()) {
        println!("cargo:warning=cannot update {}: {}", path.display(), e);
    }
    next
}

fn main() {
    println!("cargo:rerun-if-changed=src");
    println!("cargo:rerun-if-changed=Cargo.toml");

    let build = next_build_number(Path::new(COUNTER_FILE));
    let compiled_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    println!("cargo:rustc-env=NUTRILABEL_BUILD_NUMBER={}", build);
    println!("cargo:rustc-env=NUTRILABEL_BUILD_TIMESTAMP={}", compiled_at);
}
