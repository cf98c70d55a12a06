use anyhow::Result;
use parley_client::LogoutOutcome;
use parley_model::{AuthResponse, UserProfile};
use serde::Serialize;
use serde_json::{Value, json};

/// Prints results either as text for people or as JSON for scripts.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// `text` in text mode, `value` in JSON mode.
    pub fn message(&self, text: &str, value: Value) -> Result<()> {
        if self.json {
            return self.print_json(&value);
        }
        println!("{}", text);
        Ok(())
    }

    /// The token itself is never printed, in either mode.
    pub fn auth_response(
        &self,
        action: &str,
        response: &AuthResponse,
    ) -> Result<()> {
        let has_session = response.bearer_token().is_some();
        if self.json {
            return self.print_json(&json!({
                "authenticated": has_session,
                "user": response.user,
            }));
        }

        let who = response
            .user
            .as_ref()
            .and_then(UserProfile::display_name)
            .unwrap_or_else(|| "unknown user".to_string());
        if has_session {
            println!("{} as {}", action, who);
        } else {
            println!("{} as {}, but the server issued no session", action, who);
        }
        Ok(())
    }

    pub fn logout(&self, outcome: &LogoutOutcome) -> Result<()> {
        let (status, text) = match outcome {
            LogoutOutcome::Revoked => ("revoked", "Signed out".to_string()),
            LogoutOutcome::NoSession => {
                ("no_session", "No session to sign out of".to_string())
            }
            LogoutOutcome::LocalOnly { reason, .. } => (
                "local_only",
                format!(
                    "Signed out locally; the server did not confirm: {}",
                    reason.message()
                ),
            ),
        };
        self.message(&text, json!({ "logout": status }))
    }

    pub fn profile(&self, profile: &UserProfile) -> Result<()> {
        if self.json {
            return self.print_json(profile);
        }

        let rows = [
            ("Name", profile.display_name()),
            ("Username", profile.username.clone()),
            ("Email", profile.email.clone()),
            ("Phone", profile.phone_number.clone()),
            ("Bio", profile.bio.clone()),
            ("Picture", profile.profile_picture_url.clone()),
        ];
        for (label, value) in rows {
            let value = value.filter(|v| !v.is_empty());
            println!("{:<9} {}", label, value.as_deref().unwrap_or("-"));
        }
        Ok(())
    }
}
