use secrets_core::panel::PanelOutcome;
use secrets_core::resources::{Permissions, Secrets, Tokens, Users, expiry_label, parse_expiry};

use super::{Context, StdoutClipboard, TerminalConfirm};
use crate::cli::{PermissionsCommand, SecretsCommand, TokensCommand, UsersCommand};
use crate::{Error, Result};

pub async fn secrets(ctx: &Context, cmd: SecretsCommand) -> Result<()> {
    let panel = ctx.panel::<Secrets>().await?;
    match cmd {
        SecretsCommand::List { filter, reveal } => {
            if let Some(filter) = filter {
                panel.set_filter(filter);
            }
            let visible = panel.visible_records();
            if visible.is_empty() {
                println!("No secrets");
            }
            for secret in &visible {
                if reveal {
                    panel.toggle_reveal(&secret.id);
                }
                println!(
                    "{}\t{}\t{}",
                    secret.key,
                    panel.displayed_value(secret),
                    secret.updated_at
                );
            }
            Ok(())
        }
        SecretsCommand::Get { key } => {
            let secret = panel
                .records()
                .into_iter()
                .find(|s| s.key == key)
                .ok_or_else(|| Error::Custom(format!("Secret \"{key}\" not found")))?;
            if !panel.copy_value(&secret, &StdoutClipboard) {
                return Err(Error::Custom("Could not write the value".into()));
            }
            ctx.finish_logged(PanelOutcome::Applied)
        }
        SecretsCommand::Create { key, value } => {
            ctx.finish(panel.open_create())?;
            panel.edit_create(|draft| {
                draft.key = key;
                draft.value = value;
            });
            ctx.finish(panel.submit_create().await)
        }
        SecretsCommand::Update { key, value } => {
            let secret = panel
                .records()
                .into_iter()
                .find(|s| s.key == key)
                .ok_or_else(|| Error::Custom(format!("Secret \"{key}\" not found")))?;
            ctx.finish(panel.open_edit(&secret))?;
            panel.edit_patch(|patch| patch.value = value);
            ctx.finish(panel.submit_edit().await)
        }
        SecretsCommand::Delete { key, confirm } => {
            let confirm = TerminalConfirm::new(confirm.yes);
            ctx.finish(panel.delete(&key, &confirm).await)
        }
    }
}

pub async fn users(ctx: &Context, cmd: UsersCommand) -> Result<()> {
    let panel = ctx.panel::<Users>().await?;
    match cmd {
        UsersCommand::List => {
            let users = panel.records();
            if users.is_empty() {
                println!("No users");
            }
            for user in &users {
                println!("{}\t{}\t{}", user.id, user.username, user.created_at);
            }
            Ok(())
        }
        UsersCommand::Create { username, password } => {
            let password = match password {
                Some(password) => password,
                None => rpassword::prompt_password(format!("Password for {username}: "))?,
            };
            ctx.finish(panel.open_create())?;
            panel.edit_create(|draft| {
                draft.username = username;
                draft.password = password;
            });
            ctx.finish(panel.submit_create().await)
        }
        UsersCommand::Delete { id, confirm } => {
            let confirm = TerminalConfirm::new(confirm.yes);
            ctx.finish(panel.delete(&id, &confirm).await)
        }
    }
}

pub async fn tokens(ctx: &Context, cmd: TokensCommand) -> Result<()> {
    let panel = ctx.panel::<Tokens>().await?;
    match cmd {
        TokensCommand::List { reveal } => {
            let tokens = panel.records();
            if tokens.is_empty() {
                println!("No tokens");
            }
            for token in &tokens {
                if reveal {
                    panel.toggle_reveal(&token.id);
                }
                println!(
                    "{}\t{}\t{}",
                    token.id,
                    panel.displayed_token(token),
                    expiry_label(token)
                );
            }
            Ok(())
        }
        TokensCommand::Show { id } => {
            let token = panel
                .records()
                .into_iter()
                .find(|t| t.id == id)
                .ok_or_else(|| Error::Custom(format!("Token \"{id}\" not found")))?;
            if !panel.copy_token(&token, &StdoutClipboard) {
                return Err(Error::Custom("Could not write the token".into()));
            }
            ctx.finish_logged(PanelOutcome::Applied)
        }
        TokensCommand::Create { token, expires_at } => {
            let expires_at = parse_expiry(expires_at.as_deref().unwrap_or_default())
                .map_err(Error::Custom)?;
            ctx.finish(panel.open_create())?;
            let value = panel.edit_create(|draft| {
                if let Some(token) = token {
                    draft.token = token;
                }
                draft.expires_at = expires_at;
                draft.token.clone()
            });
            ctx.finish(panel.submit_create().await)?;
            println!("{value}");
            Ok(())
        }
        TokensCommand::Delete { id, confirm } => {
            let confirm = TerminalConfirm::new(confirm.yes);
            ctx.finish(panel.delete(&id, &confirm).await)
        }
        // Handled before a session is needed.
        TokensCommand::Generate => Ok(()),
    }
}

pub async fn permissions(ctx: &Context, cmd: PermissionsCommand) -> Result<()> {
    let panel = ctx.panel::<Permissions>().await?;
    match cmd {
        PermissionsCommand::List => {
            let permissions = panel.records();
            if permissions.is_empty() {
                println!("No permissions");
            }
            for permission in &permissions {
                println!(
                    "{}\t{}\t{}",
                    permission.id,
                    panel.token_label(permission),
                    permission.secret_key_pattern
                );
            }
            Ok(())
        }
        PermissionsCommand::Create { token_id, pattern } => {
            ctx.finish(panel.open_create())?;
            panel.edit_create(|draft| {
                draft.token_id = token_id;
                draft.secret_key_pattern = pattern;
            });
            ctx.finish(panel.submit_create().await)
        }
        PermissionsCommand::Update { id, pattern } => {
            let permission = panel
                .records()
                .into_iter()
                .find(|p| p.id == id)
                .ok_or_else(|| Error::Custom(format!("Permission \"{id}\" not found")))?;
            ctx.finish(panel.open_edit(&permission))?;
            panel.edit_patch(|patch| patch.secret_key_pattern = pattern);
            ctx.finish(panel.submit_edit().await)
        }
        PermissionsCommand::Delete { id, confirm } => {
            let confirm = TerminalConfirm::new(confirm.yes);
            ctx.finish(panel.delete(&id, &confirm).await)
        }
    }
}
