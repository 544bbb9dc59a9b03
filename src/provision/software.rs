use crate::config::collector::is_yes;
use crate::provision::Context;
use crate::utils::exec::CommandSpec;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Optional software: two category questions, then a loop of installer
/// files supplied by the operator. Nothing in here can fail the run.
pub fn install_optional_software(ctx: &mut Context<'_>) -> Result<()> {
    ask_category(
        ctx,
        "inventory management software",
        "Path to the inventory agent installer",
    )?;
    ask_category(ctx, "anti-virus software", "Path to the anti-virus installer")?;

    let answer = ctx.ask("Install additional software from .sh or .deb files? (y/N)")?;
    if !is_yes(&answer) {
        ctx.logger.info("Skipping additional software installation");
        return Ok(());
    }

    let mut processed = 0;
    loop {
        let entry = ctx.ask("Path to a .sh or .deb file (empty line to finish)")?;
        if entry.is_empty() {
            break;
        }
        if install_item(ctx, Path::new(&entry)) {
            processed += 1;
        }
    }

    ctx.logger.info(&format!(
        "Additional software: {} item(s) processed",
        processed
    ));
    Ok(())
}

/// Records what the operator wants for a software category.
///
/// No installer is run for these categories; the intent and path go to the
/// log for follow-up.
fn ask_category(ctx: &mut Context<'_>, category: &str, path_prompt: &str) -> Result<()> {
    let answer = ctx.ask(&format!("Install {}? (y/N)", category))?;
    if !is_yes(&answer) {
        ctx.logger.info(&format!("Skipping {}", category));
        return Ok(());
    }

    ctx.logger.info(&format!("Operator requested {}", category));
    let path = ctx.ask(path_prompt)?;
    if path.is_empty() {
        ctx.logger.warn(&format!("No installer path given for {}", category));
    } else {
        ctx.logger.info(&format!(
            "Installer for {}: {} (not installed automatically)",
            category, path
        ));
    }
    Ok(())
}

/// Dispatch one file by extension. Returns whether it was processed.
fn install_item(ctx: &Context<'_>, path: &Path) -> bool {
    if !path.is_file() {
        ctx.logger.error(&format!("File not found: {}", path.display()));
        return false;
    }

    // Absolute, so a bare script name is not looked up on PATH
    let path: PathBuf = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let shown = path.display().to_string();

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("sh") => {
            ctx.attempt(
                &CommandSpec::new("chmod", &["+x", &shown]),
                &format!("Make {} executable", shown),
            );
            if ctx.attempt(
                &CommandSpec::new(&shown, &[]),
                &format!("Run installer script {}", shown),
            ) {
                ctx.done(&format!("Script {} completed", shown));
            }
            true
        }
        Some("deb") => {
            if ctx.attempt(
                &CommandSpec::new("dpkg", &["-i", &shown]),
                &format!("Install package file {}", shown),
            ) {
                ctx.done(&format!("Package {} installed", shown));
            }
            // Always: a failed dpkg -i usually just means missing dependencies
            let fixup = CommandSpec::new("apt-get", &["install", "-f", "-y"])
                .with_env("DEBIAN_FRONTEND", "noninteractive");
            if !ctx.exec.run(&fixup, "Fix package dependencies").success() {
                ctx.logger.warn("Dependency fix-up did not complete cleanly");
            }
            true
        }
        _ => {
            ctx.logger.warn(&format!(
                "Unsupported file type: {} (only .sh and .deb are supported)",
                shown
            ));
            false
        }
    }
}
