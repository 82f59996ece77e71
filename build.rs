fn main() {
    println!("cargo:rerun-if-env-changed=CODEX_LITELLM_RELEASE");

    // The release whose artifacts the installer downloads. Packagers may pin
    // a different release than the crate version (e.g. "1.4.0" or "v1.4.0").
    let version = match std::env::var("CODEX_LITELLM_RELEASE") {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => std::env::var("CARGO_PKG_VERSION").unwrap_or_default(),
    };

    // Strip 'v' prefix if present (e.g., "v1.0.0" -> "1.0.0")
    let version = version.strip_prefix('v').unwrap_or(&version);

    println!("cargo:rustc-env=CODEX_LITELLM_RELEASE_VERSION={}", version);
}
