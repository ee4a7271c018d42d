//! User-Agent synthesized from the host platform.

use std::env::consts::{ARCH, OS};

pub fn os_name() -> &'static str {
    match OS {
        "android" => "Android",
        "macos" | "ios" => "Macintosh",
        "freebsd" | "openbsd" | "netbsd" | "dragonfly" => "UNIX",
        "linux" => "Linux",
        _ => "Windows",
    }
}

pub fn os_arch() -> &'static str {
    match ARCH {
        "x86_64" => "x86_64",
        "aarch64" => "ARM64",
        "arm" => "ARM",
        _ => "x86_32",
    }
}

pub fn user_agent() -> String {
    format!(
        "Mozilla/5.0 ({}, {}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36",
        os_name(),
        os_arch()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_embeds_platform() {
        let ua = user_agent();
        assert!(ua.starts_with("Mozilla/5.0 ("));
        assert!(ua.contains(os_name()));
        assert!(ua.contains(os_arch()));
    }
}
