//! Operating system identification for the `User-Agent` header.

use std::sync::OnceLock;

use sysinfo::System;

/// `(name, version)` of the host OS, resolved once per process.
static OS_INFO: OnceLock<(String, String)> = OnceLock::new();

/// Makes a value usable as a single `User-Agent` product token.
fn product_token(raw: &str) -> String {
    let token: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() || c == '/' { '-' } else { c })
        .collect();
    if token.is_empty() { "unknown".to_string() } else { token }
}

fn os_info() -> &'static (String, String) {
    OS_INFO.get_or_init(|| {
        let name = System::name().unwrap_or_else(|| std::env::consts::OS.to_string());
        let version = System::os_version().unwrap_or_default();
        (product_token(&name), product_token(&version))
    })
}

/// Formats `<sdk-name>/<sdk-version> <os-name>/<os-version>`.
pub fn user_agent(sdk_name: &str, sdk_version: &str) -> String {
    let (os_name, os_version) = os_info();
    format!(
        "{}/{} {os_name}/{os_version}",
        product_token(sdk_name),
        product_token(sdk_version)
    )
}
