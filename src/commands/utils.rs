use crate::logging::Logger;
use std::io::{self, Write};

const RULE: &str = "==========================================";

/// Get version string for CLI
pub fn get_version_string() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Title block shown at the start of a run (and at the top of `--help`).
pub fn banner_lines() -> Vec<String> {
    vec![
        RULE.to_string(),
        format!("  hostprep v{}", get_version_string()),
        "  Debian host provisioning and Active Directory join".to_string(),
        RULE.to_string(),
    ]
}

pub fn print_banner(logger: &Logger, demo_mode: bool) {
    for line in banner_lines() {
        logger.plain(&line);
    }
    if demo_mode {
        logger.demo("Demo mode: no changes will be made to this system");
    }
}

pub fn write_usage(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "Usage: sudo hostprep [OPTIONS]")?;
    writeln!(out)?;
    writeln!(out, "Options:")?;
    writeln!(
        out,
        "  --demo       Walk through every step without changing the system"
    )?;
    writeln!(out, "  --help       Show this help and exit")?;
    writeln!(out, "  --version    Show version and exit")?;
    Ok(())
}

pub fn write_help(out: &mut dyn Write) -> io::Result<()> {
    for line in banner_lines() {
        writeln!(out, "{}", line)?;
    }
    writeln!(out)?;
    write_usage(out)?;
    writeln!(out)?;
    writeln!(out, "Examples:")?;
    writeln!(out, "  sudo hostprep          Provision this machine")?;
    writeln!(out, "  hostprep --demo        Rehearse the run; nothing is changed")?;
    writeln!(out)?;
    writeln!(out, "Features:")?;
    writeln!(out, "  - Sets the hostname and updates /etc/hosts")?;
    writeln!(out, "  - Creates a local emergency administrator account")?;
    writeln!(out, "  - Installs sudo, the SSH server and domain integration packages")?;
    writeln!(out, "  - Joins the machine to an Active Directory domain (realmd/sssd)")?;
    writeln!(out, "  - Grants IT admins and the main user administrative rights")?;
    writeln!(out, "  - Installs optional .sh / .deb software")?;
    writeln!(out, "  - Writes a full log of every action")?;
    writeln!(out)?;
    writeln!(out, "Requirements:")?;
    writeln!(out, "  - Debian with apt and systemd")?;
    writeln!(out, "  - Root privileges (not needed for --demo)")?;
    writeln!(out, "  - Network access to the package mirrors and a domain controller")?;
    writeln!(out, "  - A domain account allowed to join machines to the domain")?;
    Ok(())
}
