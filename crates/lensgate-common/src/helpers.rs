//! Environment helpers shared by the binaries.

/// Reads a boolean flag. `1`, `true`, `yes` and `on` (any case) are truthy.
pub fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => parse_bool(&value),
        Err(_) => default,
    }
}

pub fn env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

pub fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

/// Reads a variable and returns it trimmed, treating blank values as unset.
pub fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Lowercases an origin and strips a trailing slash so allow-list lookups are exact.
pub fn normalize_origin(origin: &str) -> String {
    origin.trim().trim_end_matches('/').to_ascii_lowercase()
}

/// Strips trailing slashes from a base URL so paths can be appended with `/`.
pub fn trim_base_url(url: &str) -> &str {
    url.trim().trim_end_matches('/')
}
