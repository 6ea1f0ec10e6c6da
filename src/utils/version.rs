//! Build version information

/// Crate version as compiled
pub fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// `name vversion` banner used in startup logs
pub fn banner() -> String {
    format!("{} v{}", env!("CARGO_PKG_NAME"), get_version())
}
