//! Version command

/// Commit the binary was built from, when the build provides it
const COMMIT: Option<&str> = option_env!("SCHERIFF_COMMIT");

/// Build date, when the build provides it
const BUILD_DATE: Option<&str> = option_env!("SCHERIFF_BUILD_DATE");

pub fn version_line() -> String {
    format!(
        "scheriff {} (commit: {}, built: {})",
        env!("CARGO_PKG_VERSION"),
        COMMIT.unwrap_or("unknown"),
        BUILD_DATE.unwrap_or("unknown")
    )
}

pub fn run() {
    println!("{}", version_line());
}
