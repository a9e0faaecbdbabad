//! Version information for the application, populated at build time.
//!
//! Environment display format:
//! - Prod (stable): `stable:{version}`
//! - Local/Test: `main:{commit}`

/// Runtime environment enum for services that determine environment at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnv {
    /// Local development
    Local,
    /// Production
    Prod,
    /// Test environment
    Test,
}

/// Get the build date in RFC3339 format
pub fn build_date() -> &'static str {
    env!("BUILD_DATE")
}

/// Get the git commit hash (short)
pub fn build_commit() -> &'static str {
    env!("BUILD_COMMIT")
}

/// Get the git branch name
pub fn build_branch() -> &'static str {
    env!("BUILD_BRANCH")
}

/// Get the package version
pub fn build_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Format the version string for a runtime-detected environment.
///
/// Production reports the released package version; everything else reports
/// the branch and commit it was built from.
pub fn format_version_for_runtime_env(env: RuntimeEnv) -> String {
    match env {
        RuntimeEnv::Prod => format!("stable:{}", build_version()),
        RuntimeEnv::Local | RuntimeEnv::Test => {
            format!("{}:{}", build_branch(), build_commit())
        }
    }
}
