use crate::config::Secret;
use crate::provision::Context;
use crate::utils::accounts;
use crate::utils::exec::CommandSpec;
use anyhow::Result;

/// Create the local fallback administrator, unless it already exists.
pub fn create_emergency_account(ctx: &mut Context<'_>) -> Result<()> {
    let user = ctx.settings.emergency_user.as_str();

    if accounts::user_exists(&ctx.settings.passwd_file, user)? {
        ctx.logger.info(&format!(
            "Emergency account '{}' already exists, skipping creation",
            user
        ));
        return Ok(());
    }

    ctx.exec.require(
        &CommandSpec::new("useradd", &["-m", "-s", "/bin/bash", user]),
        &format!("Create emergency account {}", user),
    )?;

    // Demo runs carry no password; the command is only displayed, masked
    let password = ctx
        .config
        .emergency_password
        .as_ref()
        .map(|p| p.expose())
        .unwrap_or_default();
    let credentials = Secret::new(format!("{}:{}", user, password));
    ctx.exec.require(
        &CommandSpec::new("chpasswd", &[]).with_stdin(credentials),
        &format!("Set password for {}", user),
    )?;

    let group = ctx.settings.admin_group.as_str();
    ctx.exec.require(
        &CommandSpec::new("usermod", &["-aG", group, user]),
        &format!("Add {} to {} group", user, group),
    )?;

    ctx.done(&format!("Emergency account '{}' created", user));
    Ok(())
}

fn sed_escape(value: &str) -> String {
    value
        .replace('\\', r"\\")
        .replace('/', r"\/")
        .replace('&', r"\&")
}

pub fn set_hostname(ctx: &mut Context<'_>) -> Result<()> {
    let hostname = ctx.config.hostname.as_str();

    ctx.exec.require(
        &CommandSpec::new("hostnamectl", &["set-hostname", hostname]),
        &format!("Set hostname to {}", hostname),
    )?;

    let expression = format!(
        r"s/^127\.0\.1\.1[[:space:]].*/127.0.1.1\t{}/",
        sed_escape(hostname)
    );
    ctx.exec.require(
        &CommandSpec::new("sed", &["-i", &expression, "/etc/hosts"]),
        "Update 127.0.1.1 entry in /etc/hosts",
    )?;

    ctx.done(&format!("Hostname set to {}", hostname));
    Ok(())
}

/// Enable SSH and keep the machine from sleeping.
pub fn configure_services(ctx: &mut Context<'_>) -> Result<()> {
    ctx.exec.require(
        &CommandSpec::new("systemctl", &["enable", "ssh"]),
        "Enable SSH service at boot",
    )?;
    ctx.exec.require(
        &CommandSpec::new("systemctl", &["start", "ssh"]),
        "Start SSH service",
    )?;

    if !ctx.settings.masked_units.is_empty() {
        ctx.exec.require(
            &CommandSpec::new("systemctl", &["mask"])
                .args(ctx.settings.masked_units.iter().cloned()),
            "Mask sleep and hibernate targets",
        )?;
    }

    ctx.done("Services configured");
    Ok(())
}
