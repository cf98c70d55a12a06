use std::path::Path;

use anyhow::{Context, Result};
use parley_client::{
    AuthManager, ClientConfig, ProfileDraft, ProfilePicture, ProfileService,
};
use parley_model::RegisterRequest;
use serde_json::json;

use crate::output::Output;
use crate::{Cli, Command, ProfileAction};

/// Defaults, config file and environment, then the command-line flags.
fn resolve_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config =
        ClientConfig::load().context("Failed to load configuration")?;
    if let Some(server) = &cli.server {
        config.base_url = server.clone();
    }
    if let Some(session_file) = &cli.session_file {
        config.session_path = session_file.clone();
    }
    Ok(config)
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    let out = Output::new(cli.json);
    let manager = AuthManager::from_config(&config)
        .context("Failed to create API client")?;
    if let Err(err) = manager.restore().await {
        log::warn!("Could not restore stored session: {}", err);
    }

    match cli.command {
        Command::Register {
            username,
            email,
            first_name,
            last_name,
            phone,
            password,
            password_confirmation,
        } => {
            let request = RegisterRequest {
                username,
                email,
                first_name,
                last_name,
                phone_number: phone,
                password: password.into(),
                password_confirmation: password_confirmation.into(),
            };
            let response = manager.register(&request).await?;
            out.auth_response("Registered", &response)?;
        }
        Command::Login { email, password } => {
            let response = manager.login(&email, &password).await?;
            out.auth_response("Signed in", &response)?;
        }
        Command::Logout => {
            let outcome = manager.logout().await?;
            out.logout(&outcome)?;
        }
        Command::Whoami { cached } => {
            if cached {
                let user = manager.cached_user().await?;
                match user {
                    Some(user) => out.profile(&user)?,
                    None => out.message("No cached profile", json!(null))?,
                }
            } else {
                let user = manager.current_user().await?;
                out.profile(&user)?;
            }
        }
        Command::Status => {
            let authenticated = manager.is_authenticated().await;
            let text = if authenticated {
                "Signed in"
            } else {
                "Not signed in"
            };
            out.message(text, json!({ "authenticated": authenticated }))?;
        }
        Command::Profile { action } => {
            run_profile(ProfileService::new(manager), action, &out).await?;
        }
    }
    Ok(())
}

async fn run_profile(
    service: ProfileService,
    action: ProfileAction,
    out: &Output,
) -> Result<()> {
    match action {
        ProfileAction::Show => {
            let profile = service.fetch().await?;
            out.profile(&profile)?;
        }
        ProfileAction::Update {
            first_name,
            last_name,
            bio,
            username,
            email,
            phone,
        } => {
            let current = service.fetch().await?;
            let mut draft = ProfileDraft::new(&current);
            let fields = &mut draft.fields;
            let edits = [
                (&mut fields.first_name, first_name),
                (&mut fields.last_name, last_name),
                (&mut fields.bio, bio),
                (&mut fields.username, username),
                (&mut fields.email, email),
                (&mut fields.phone_number, phone),
            ];
            for (field, value) in edits {
                if let Some(value) = value {
                    *field = value;
                }
            }

            if !draft.is_dirty() {
                return out.message("Nothing to update", json!(null));
            }
            let saved = service.update(&draft.to_request()).await?;
            out.profile(&saved)?;
        }
        ProfileAction::UploadPicture { path, mime } => {
            let picture = load_picture(&path, mime).await?;
            let url = service.upload_picture(picture).await?;
            out.message(
                &format!("Profile picture uploaded: {}", url),
                json!({ "profile_picture_url": url }),
            )?;
        }
        ProfileAction::RemovePicture => {
            service.remove_picture().await?;
            out.message("Profile picture removed", json!(null))?;
        }
    }
    Ok(())
}

async fn load_picture(
    path: &Path,
    mime: Option<String>,
) -> Result<ProfilePicture> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut picture = ProfilePicture::jpeg(bytes);
    if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
        picture = picture.with_file_name(name);
    }
    match mime.or_else(|| guess_mime(path).map(str::to_string)) {
        Some(mime) => Ok(picture.with_mime(mime)),
        None => Ok(picture),
    }
}

fn guess_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}
