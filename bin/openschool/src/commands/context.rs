//! Context management commands.

use std::path::Path;

use anyhow::Result;

use crate::config::{ClientConfig, Context};

/// Register a context or update its server URL. Keeps an existing token so
/// changing the URL doesn't force a re-login.
pub fn set(name: &str, server: &str, client_config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;

    let token = config
        .get_mut(name)
        .map(|c| c.token.clone())
        .unwrap_or_default();
    config.upsert_context(Context {
        name: name.to_string(),
        server: server.trim_end_matches('/').to_string(),
        token,
    });
    if config.current_context.is_empty() {
        config.current_context = name.to_string();
    }
    config.save(client_config_path)?;

    println!("Context \"{}\" set to {}.", name, server);
    Ok(())
}

/// List contexts; the current one is marked with `*`.
pub fn list(client_config_path: &Path) -> Result<()> {
    let config = ClientConfig::load(client_config_path)?;

    if config.contexts.is_empty() {
        println!("No contexts. Run `openschool context set <name> --server <url>`.");
        return Ok(());
    }
    for ctx in &config.contexts {
        let marker = if ctx.name == config.current_context { "*" } else { " " };
        let auth = if ctx.token.is_empty() { "" } else { " (logged in)" };
        println!(
            "{} {}  {}{}",
            marker,
            ctx.name,
            if ctx.server.is_empty() { "-" } else { &ctx.server },
            auth
        );
    }
    Ok(())
}

/// Delete a context.
pub fn delete(name: &str, client_config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;
    if !config.remove_context(name) {
        anyhow::bail!("No such context: {}", name);
    }
    config.save(client_config_path)?;
    println!("Context \"{}\" deleted.", name);
    Ok(())
}

/// Switch the current context.
pub fn use_context(name: &str, client_config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;
    if config.get_mut(name).is_none() {
        anyhow::bail!("No such context: {}", name);
    }
    config.current_context = name.to_string();
    config.save(client_config_path)?;
    println!("Switched to context \"{}\".", name);
    Ok(())
}
