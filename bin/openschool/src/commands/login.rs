//! Login / logout commands.

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::Result;

use openschool_client::ApiClient;

use crate::config::ClientConfig;

/// Login to the current context's server and store the returned token.
pub async fn login(username: &str, password: Option<&str>, client_config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;

    let ctx = config
        .current()
        .ok_or_else(|| anyhow::anyhow!("No current context. Run `openschool use <name>`."))?
        .clone();

    if ctx.server.is_empty() {
        anyhow::bail!(
            "No server URL set for context \"{}\". Run `openschool context set {} --server <url>`.",
            ctx.name,
            ctx.name
        );
    }

    let password = match password {
        Some(p) => p.to_string(),
        None => prompt_password()?,
    };

    let client = ApiClient::new(&ctx.server, None)?;
    let token = client
        .login(username, &password)
        .await
        .map_err(|e| anyhow::anyhow!("Login failed: {}", e))?;

    let ctx_mut = config
        .get_mut(&ctx.name)
        .ok_or_else(|| anyhow::anyhow!("Context disappeared"))?;
    ctx_mut.token = token;
    config.save(client_config_path)?;

    println!("Logged in as {}.", username);
    Ok(())
}

/// Clear the token from the current context.
pub fn logout(client_config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;

    let name = config
        .current()
        .ok_or_else(|| anyhow::anyhow!("No current context."))?
        .name
        .clone();
    if let Some(ctx) = config.get_mut(&name) {
        ctx.token = String::new();
    }
    config.save(client_config_path)?;

    println!("Logged out.");
    Ok(())
}

fn prompt_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
