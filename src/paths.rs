// File: src/paths.rs
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Overrides every directory; used by tests.
pub const TEST_DIR_ENV: &str = "DUEDECK_TEST_DIR";

#[derive(Debug, Clone, Copy)]
enum DirKind {
    Data,
    Config,
}

pub struct AppPaths;

impl AppPaths {
    fn locate(kind: DirKind) -> Result<PathBuf> {
        let path = match env::var_os(TEST_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => {
                let proj = ProjectDirs::from("com", "duedeck", "duedeck")
                    .with_context(|| format!("Could not determine {:?} directory", kind))?;
                match kind {
                    DirKind::Data => proj.data_dir().to_path_buf(),
                    DirKind::Config => proj.config_dir().to_path_buf(),
                }
            }
        };
        if !path.exists() {
            fs::create_dir_all(&path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(path)
    }

    pub fn get_data_dir() -> Result<PathBuf> {
        Self::locate(DirKind::Data)
    }

    pub fn get_config_dir() -> Result<PathBuf> {
        Self::locate(DirKind::Config)
    }

    pub fn get_config_file_path() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("config.toml"))
    }

    /// Theme and other UI state that is not configuration.
    pub fn get_prefs_path() -> Option<PathBuf> {
        Self::get_data_dir().ok().map(|p| p.join("prefs.toml"))
    }

    pub fn get_log_path() -> Option<PathBuf> {
        Self::get_data_dir().ok().map(|p| p.join("duedeck.log"))
    }

    pub fn get_panic_log_path() -> Option<PathBuf> {
        Self::get_data_dir().ok().map(|p| p.join("duedeck_panic.log"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_puts_everything_in_one_place() {
        let dir = env::temp_dir().join(format!("duedeck-paths-{}", uuid::Uuid::new_v4()));
        // SAFETY: no other test in this binary reads the variable concurrently
        // with a different value.
        unsafe { env::set_var(TEST_DIR_ENV, &dir) };

        assert_eq!(AppPaths::get_config_file_path().unwrap(), dir.join("config.toml"));
        assert_eq!(AppPaths::get_prefs_path(), Some(dir.join("prefs.toml")));
        assert_eq!(AppPaths::get_log_path(), Some(dir.join("duedeck.log")));
        assert!(dir.is_dir());

        let _ = fs::remove_dir_all(&dir);
    }
}
