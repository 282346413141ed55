//! Build stamp
//!
//! `build.rs` counts rebuilds and records when the binary was compiled. The
//! stamp shows up in the startup banner, in `status` and in the User-Agent
//! sent to FoodData Central.

use serde::Serialize;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Rebuild counter; 0 when the build script did not run
pub const BUILD_NUMBER: u64 = match option_env!("NUTRILABEL_BUILD_NUMBER") {
    Some(s) => digits_to_u64(s),
    None => 0,
};

/// RFC 3339 UTC compile time
pub const BUILD_TIMESTAMP: &str = match option_env!("NUTRILABEL_BUILD_TIMESTAMP") {
    Some(s) => s,
    None => "unknown",
};

// Non-digit input reads as 0
const fn digits_to_u64(s: &str) -> u64 {
    let bytes = s.as_bytes();
    let mut value: u64 = 0;
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            return 0;
        }
        value = value * 10 + (bytes[i] - b'0') as u64;
        i += 1;
    }
    value
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildStamp {
    pub version: &'static str,
    pub build_number: u64,
    pub build_timestamp: &'static str,
}

impl BuildStamp {
    pub const fn current() -> Self {
        Self {
            version: VERSION,
            build_number: BUILD_NUMBER,
            build_timestamp: BUILD_TIMESTAMP,
        }
    }

    /// `nutrilabel/1.0.0 (build 42)`
    pub fn user_agent(&self) -> String {
        format!("nutrilabel/{} (build {})", self.version, self.build_number)
    }
}

pub fn print_startup_banner() {
    let stamp = BuildStamp::current();
    eprintln!("nutrilabel {} (build {}, compiled {})", stamp.version, stamp.build_number, stamp.build_timestamp);
    eprintln!("Nutrition Facts labels from recipes, over MCP stdio");
}
