use super::ui;
use crate::core::SavedFundsError;
use crate::store::UserDirectory;
use anyhow::Result;

pub async fn register(directory: &UserDirectory, username: &str) -> Result<()> {
    if username.trim().is_empty() {
        anyhow::bail!("Username must not be empty");
    }

    let registration = directory.register(username).await.map_err(|e| match e {
        SavedFundsError::UsernameTaken { .. } => {
            anyhow::Error::new(e).context(format!("Username '{}' is taken", username.trim()))
        }
        other => anyhow::Error::new(other).context("Failed to register user"),
    })?;

    println!(
        "{} {}",
        ui::style_text("Registered", ui::StyleType::Success),
        registration.user.username
    );
    println!("User id: {}", registration.user.id);
    println!("Token:   {}", registration.token);
    println!(
        "{}",
        ui::style_text(
            "Pass the token with --token or export it as MFBOOK_TOKEN.",
            ui::StyleType::Subtle
        )
    );
    Ok(())
}
