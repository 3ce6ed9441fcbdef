// Smartmarks platform paths.
// Config and data directories come from `dirs`; `SMARTMARKS_DATA_DIR` overrides
// the data directory (used by tests and packaged deployments).

use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "smartmarks";

/// Returns the configuration directory, e.g. `~/.config/smartmarks` on Linux.
pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(env::temp_dir)
        .join(APP_DIR)
}

/// Returns the data directory holding the SQLite database.
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = env::var("SMARTMARKS_DATA_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::data_dir().unwrap_or_else(env::temp_dir).join(APP_DIR)
}
