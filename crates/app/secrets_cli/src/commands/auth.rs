use std::sync::Arc;

use secrets_core::console::{Console, ConsoleError};
use secrets_core::login::CaptchaHost;
use secrets_core::router::{HashRouter, MemoryLocation};

use super::Context;
use crate::Result;
use crate::captcha::{ManualCaptcha, prompt_proof};
use crate::cli::LoginArgs;

pub fn status(ctx: &Context) -> Result<()> {
    println!("Server:  {}", ctx.config.base_url);
    println!("Session: {}", ctx.config.session_file.display());
    if ctx.session.is_authenticated() {
        println!("Logged in");
    } else {
        println!("Not logged in");
    }
    Ok(())
}

pub async fn login(ctx: &Context, args: LoginArgs) -> Result<()> {
    let password = match args.password {
        Some(password) => password,
        None => rpassword::prompt_password("Password: ")?,
    };

    let mut console = Console::new(
        ctx.client.clone(),
        ctx.session.clone(),
        HashRouter::new(Arc::new(MemoryLocation::new())),
        ctx.notifications.clone(),
    );

    let site_key = args
        .site_key
        .or_else(|| ctx.config.turnstile_site_key.clone())
        .filter(|key| !key.trim().is_empty());
    if let Some(site_key) = site_key {
        let proof = match args.captcha_token {
            Some(proof) => proof,
            None => prompt_proof(&site_key)?,
        };
        let host = CaptchaHost::new(Arc::new(ManualCaptcha::new(proof)));
        console = console.with_captcha(Arc::new(host), &site_key);
        console.show_login().await.map_err(ConsoleError::from)?;
    }

    console.login(&args.username, &password).await?;
    println!("Logged in as {}", args.username);
    Ok(())
}

pub fn logout(ctx: &Context) -> Result<()> {
    ctx.session.end()?;
    println!("Logged out");
    Ok(())
}
