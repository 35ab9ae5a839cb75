//! Terminal stand-in for the CAPTCHA widget.
//!
//! A terminal cannot run the challenge, so the operator solves it in a
//! browser and pastes the proof. Rendering the "widget" hands that proof
//! straight to the login negotiator.

use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use log::debug;
use secrets_core::login::{
    CaptchaCallbacks, CaptchaError, CaptchaProvider, WidgetConfig, WidgetHandle,
};

pub struct ManualCaptcha {
    proof: String,
    renders: AtomicU64,
}

impl ManualCaptcha {
    pub fn new(proof: impl Into<String>) -> Self {
        Self {
            proof: proof.into(),
            renders: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl CaptchaProvider for ManualCaptcha {
    async fn load(&self) -> Result<(), CaptchaError> {
        Ok(())
    }

    fn render(
        &self,
        mount: &str,
        config: &WidgetConfig,
        callbacks: CaptchaCallbacks,
    ) -> Result<WidgetHandle, CaptchaError> {
        let n = self.renders.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("manual captcha rendered into {mount} for site key {}", config.site_key);
        if self.proof.trim().is_empty() {
            callbacks.errored();
        } else {
            callbacks.solved(self.proof.trim());
        }
        Ok(WidgetHandle(format!("manual-{n}")))
    }

    fn reset(&self, handle: &WidgetHandle) {
        debug!("captcha {} reset; the pasted proof cannot be reused", handle.0);
    }

    fn remove(&self, handle: &WidgetHandle) {
        debug!("captcha {} removed", handle.0);
    }
}

/// Ask the operator for a solved challenge proof.
pub fn prompt_proof(site_key: &str) -> std::io::Result<String> {
    let mut stdout = std::io::stdout();
    writeln!(
        stdout,
        "This server requires a captcha. Solve the challenge for site key {site_key} and paste the token."
    )?;
    write!(stdout, "Captcha token: ")?;
    stdout.flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
