use crate::provision::Context;
use crate::utils::exec::CommandSpec;
use anyhow::Result;

/// Refresh the package lists, then install sudo.
///
/// This is the first apt step of the run, so it owns the `apt-get update`.
pub fn install_sudo(ctx: &mut Context<'_>) -> Result<()> {
    let update =
        CommandSpec::new("apt-get", &["update"]).with_env("DEBIAN_FRONTEND", "noninteractive");
    let result = ctx.exec.run(&update, "Update package lists");
    if !result.success() {
        return Err(ctx.fatal(
            format!("Failed to update package lists (exit code {})", result.code()),
            "Check network connectivity and the entries in /etc/apt/sources.list",
        ));
    }

    ctx.install_packages(&ctx.settings.base_packages, "sudo")
}

pub fn install_ssh(ctx: &mut Context<'_>) -> Result<()> {
    ctx.install_packages(&ctx.settings.ssh_packages, "SSH server")
}

/// realmd, sssd, adcli and friends.
pub fn install_domain_packages(ctx: &mut Context<'_>) -> Result<()> {
    ctx.install_packages(&ctx.settings.domain_packages, "domain integration packages")
}

pub fn install_extra_packages(ctx: &mut Context<'_>) -> Result<()> {
    ctx.install_packages(&ctx.settings.extra_packages, "additional packages")
}
