// Version information module
// Provides version and build information for the ledger service

use std::fmt;

/// Version information structure
pub struct VersionInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub git_dirty: bool,
    pub build_date: &'static str,
    pub build_profile: &'static str,
    pub rustc_version: &'static str,
}

impl VersionInfo {
    /// Get the current version information
    pub fn current() -> Self {
        Self {
            version: env!("LEDGER_VERSION"),
            git_hash: env!("LEDGER_GIT_HASH"),
            git_dirty: env!("LEDGER_GIT_DIRTY") == "true",
            build_date: env!("LEDGER_BUILD_DATE"),
            build_profile: env!("LEDGER_BUILD_PROFILE"),
            rustc_version: env!("LEDGER_RUSTC_VERSION"),
        }
    }

    /// Get a short version string (just version and git hash)
    pub fn short(&self) -> String {
        if self.git_dirty {
            format!("v{} ({}+dirty)", self.version, self.git_hash)
        } else {
            format!("v{} ({})", self.version, self.git_hash)
        }
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Study Ledger v{}", self.version)?;
        writeln!(
            f,
            "Git: {}{}",
            self.git_hash,
            if self.git_dirty { " +uncommitted changes" } else { "" }
        )?;
        writeln!(f, "Built: {} ({})", self.build_date, self.build_profile)?;
        writeln!(f, "Rustc: {}", self.rustc_version)?;
        Ok(())
    }
}

/// Get the version string for --version-full output
pub fn version_string() -> String {
    let info = VersionInfo::current();
    format!("{}", info)
}
