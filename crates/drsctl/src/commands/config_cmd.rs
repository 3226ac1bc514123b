//! Config subcommand handlers.

use serde::Serialize;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

const MASK: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of the config with plaintext passwords masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some(MASK.into());
        }
    }
    cfg
}

/// Format config for the table view, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "wait = \"{}\"", cfg.defaults.wait);

    for name in sorted_names(cfg) {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "hostname = \"{}\"", p.hostname);
        if let Some(port) = p.port {
            let _ = writeln!(out, "port = {port}");
        }
        if let Some(ref u) = p.username {
            let _ = writeln!(out, "username = \"{u}\"");
        }
        if p.password.is_some() {
            let _ = writeln!(out, "password = \"{MASK}\"");
        }
        if let Some(ref env) = p.password_env {
            let _ = writeln!(out, "password_env = \"{env}\"");
        }
        if let Some(validate) = p.validate_certs {
            let _ = writeln!(out, "validate_certs = {validate}");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
    }

    out.trim_end().to_owned()
}

fn sorted_names(cfg: &Config) -> Vec<&String> {
    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    names
}

fn available(cfg: &Config) -> String {
    let names = sorted_names(cfg);
    if names.is_empty() {
        "(none)".into()
    } else {
        names
            .into_iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Serialize)]
struct ProfileEntry<'a> {
    name: &'a str,
    hostname: &'a str,
    default: bool,
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let format = config::output_format(global, &cfg);
            let out = output::render_single(format, &redacted(&cfg), format_config_redacted)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Add one to {}", config::config_path().display());
                return Ok(());
            }

            let entries: Vec<_> = sorted_names(&cfg)
                .into_iter()
                .map(|name| ProfileEntry {
                    name,
                    hostname: &cfg.profiles[name].hostname,
                    default: name == default,
                })
                .collect();
            let out = output::render_single(config::output_format(global, &cfg), &entries, |list| {
                list.iter()
                    .map(|e| {
                        let marker = if e.default { " *" } else { "" };
                        format!("{}{marker}\t{}", e.name, e.hostname)
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: available(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Default profile set to '{name}'");
            }
            Ok(())
        }

        ConfigCommand::SetPassword { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    available: available(&cfg),
                    name: profile_name,
                });
            }

            let secret = rpassword::prompt_password("Password: ").map_err(|e| {
                CliError::Validation {
                    field: "password".into(),
                    reason: format!("prompt failed: {e}"),
                }
            })?;
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "value cannot be empty".into(),
                });
            }

            drsctl_config::store_password(&profile_name, &secret)?;
            if !global.quiet {
                eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
            }
            Ok(())
        }
    }
}
