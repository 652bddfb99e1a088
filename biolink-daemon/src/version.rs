//! Version information and build metadata display

use serde::Serialize;
use std::fmt;

/// Build metadata for the running daemon
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    /// Package version from Cargo.toml
    pub daemon_version: &'static str,
    /// Target triple (e.g., x86_64-unknown-linux-gnu)
    pub target: &'static str,
    /// Build profile (debug or release)
    pub profile: &'static str,
    /// Git commit hash (if available)
    pub git_commit: Option<&'static str>,
    pub build_timestamp: &'static str,
}

impl VersionInfo {
    /// Get current version information
    pub fn current() -> Self {
        Self {
            daemon_version: env!("CARGO_PKG_VERSION"),
            target: env!("TARGET"),
            profile: if cfg!(debug_assertions) {
                "debug"
            } else {
                "release"
            },
            git_commit: option_env!("GIT_COMMIT_HASH"),
            build_timestamp: env!("BUILD_TIMESTAMP"),
        }
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "biolink-daemon {}", self.daemon_version)?;
        writeln!(f)?;

        writeln!(f, "Build Information:")?;
        writeln!(f, "  Target:       {}", self.target)?;
        writeln!(f, "  Profile:      {}", self.profile)?;
        writeln!(f, "  Build Date:   {}", self.build_timestamp)?;

        if let Some(commit) = self.git_commit {
            writeln!(f, "  Git Commit:   {}", commit)?;
        }

        Ok(())
    }
}

/// Long version string (for --version-info)
pub fn version_long() -> String {
    VersionInfo::current().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info_display() {
        let text = version_long();
        assert!(text.starts_with(&format!("biolink-daemon {}", env!("CARGO_PKG_VERSION"))));
        assert!(text.contains("Target:"));
    }
}
