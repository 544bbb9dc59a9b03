use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = "/etc/hostprep";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Operator defaults for a provisioning run.
///
/// These are not run parameters (those come from the prompts); they describe
/// the site: which packages make up each step, where logs go, and so on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_dir: PathBuf,
    pub demo_log_dir: PathBuf,
    pub emergency_user: String,
    pub admin_group: String,
    pub base_packages: Vec<String>,
    pub ssh_packages: Vec<String>,
    pub domain_packages: Vec<String>,
    pub extra_packages: Vec<String>,
    pub masked_units: Vec<String>,
    pub reboot_delay_secs: u64,
    pub passwd_file: PathBuf,
    pub viewers: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("/var/log/hostprep"),
            demo_log_dir: PathBuf::from("/tmp/hostprep"),
            emergency_user: "localadmin".to_string(),
            admin_group: "sudo".to_string(),
            base_packages: strings(&["sudo"]),
            ssh_packages: strings(&["openssh-server"]),
            domain_packages: strings(&[
                "realmd",
                "sssd",
                "sssd-tools",
                "libnss-sss",
                "libpam-sss",
                "adcli",
                "samba-common-bin",
                "oddjob",
                "oddjob-mkhomedir",
                "packagekit",
                "krb5-user",
            ]),
            extra_packages: strings(&["curl", "wget", "vim", "htop", "net-tools"]),
            masked_units: strings(&[
                "sleep.target",
                "suspend.target",
                "hibernate.target",
                "hybrid-sleep.target",
            ]),
            reboot_delay_secs: 10,
            passwd_file: PathBuf::from("/etc/passwd"),
            viewers: strings(&["gnome-text-editor", "gedit", "mousepad", "kate", "xdg-open"]),
        }
    }
}

impl Settings {
    /// Log directory for the given mode.
    pub fn log_dir_for(&self, demo_mode: bool) -> &Path {
        if demo_mode {
            &self.demo_log_dir
        } else {
            &self.log_dir
        }
    }
}

pub fn get_config_file_path() -> PathBuf {
    // Check for environment variable override
    if let Ok(path) = env::var("HOSTPREP_CONFIG") {
        return PathBuf::from(path);
    }
    Path::new(CONFIG_DIR).join(CONFIG_FILE_NAME)
}

/// Parse settings from a TOML file. Missing keys fall back to defaults.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let settings: Settings = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(settings)
}

/// Load settings for this run.
///
/// A `.env` in the working directory is applied first (best-effort), then the
/// config file if one exists, then `HOSTPREP_LOG_DIR`.
pub fn load_settings() -> Result<Settings> {
    let _ = dotenv::dotenv();

    let config_path = get_config_file_path();
    let mut settings = if config_path.exists() {
        load_settings_from(&config_path)?
    } else {
        Settings::default()
    };

    if let Ok(dir) = env::var("HOSTPREP_LOG_DIR") {
        settings.log_dir = PathBuf::from(&dir);
        settings.demo_log_dir = PathBuf::from(dir);
    }

    Ok(settings)
}
