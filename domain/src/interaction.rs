//! Discord interactions: the button press that starts verification and the
//! admin command that posts the verification message.

use crate::error::{Error, VerificationErrorKind};
use crate::verification::{Initiation, Verifier};
use chrono::Utc;
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const VERIFY_BUTTON_ID: &str = "verify_button";
pub const SEND_VERIFY_COMMAND: &str = "send-verify";

const PING: u8 = 1;
const APPLICATION_COMMAND: u8 = 2;
const MESSAGE_COMPONENT: u8 = 3;

const PONG: u8 = 1;
const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;

const EPHEMERAL: u64 = 1 << 6;
const ADMINISTRATOR: u64 = 1 << 3;

/// Inbound interaction payload, trimmed to the fields we read.
#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub member: Option<InteractionMember>,
    #[serde(default)]
    pub data: Option<InteractionData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionMember {
    pub user: InteractionUser,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Permission bitfield, serialized as a decimal string.
    #[serde(default)]
    pub permissions: Option<String>,
}

impl InteractionMember {
    fn is_administrator(&self) -> bool {
        self.permissions
            .as_deref()
            .and_then(|bits| bits.parse::<u64>().ok())
            .is_some_and(|bits| bits & ADMINISTRATOR != 0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionUser {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub custom_id: Option<String>,
}

/// Outbound interaction response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<MessageData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessageData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Value>,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            kind: PONG,
            data: None,
        }
    }

    /// A message only the invoking member can see.
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self::message(MessageData {
            content: Some(content.into()),
            flags: Some(EPHEMERAL),
            ..Default::default()
        })
    }

    fn message(data: MessageData) -> Self {
        Self {
            kind: CHANNEL_MESSAGE_WITH_SOURCE,
            data: Some(data),
        }
    }

    /// The public verification message with the "Verify Me" button.
    pub fn verification_prompt() -> Self {
        Self::message(MessageData {
            embeds: vec![json!({
                "color": 0x5865F2,
                "title": "🛡️ Server Verification",
                "description": "Welcome to the server! To gain access to all channels, please complete the verification process below.",
                "fields": [
                    {
                        "name": "📋 What happens next?",
                        "value": "Click the **Verify Me** button below to authorize with Discord and gain full server access.",
                        "inline": false
                    },
                    {
                        "name": "🔒 Is this safe?",
                        "value": "Yes! This uses Discord's official OAuth2 system to verify your identity.",
                        "inline": false
                    }
                ],
                "footer": { "text": "Verification is required to access all channels" },
                "timestamp": Utc::now().to_rfc3339()
            })],
            components: vec![json!({
                "type": 1,
                "components": [{
                    "type": 2,
                    "style": 3,
                    "label": "Verify Me",
                    "emoji": { "name": "✅" },
                    "custom_id": VERIFY_BUTTON_ID
                }]
            })],
            ..Default::default()
        })
    }

    /// Ephemeral reply carrying the link to the authorization page.
    pub fn authorize_link(url: &str) -> Self {
        Self::message(MessageData {
            content: Some(
                "**Complete Verification**\n\nClick the button below to open Discord's authorization page."
                    .to_string(),
            ),
            flags: Some(EPHEMERAL),
            components: vec![json!({
                "type": 1,
                "components": [{
                    "type": 2,
                    "style": 5,
                    "label": "Authorize",
                    "url": url
                }]
            })],
            ..Default::default()
        })
    }
}

/// Dispatch an already authenticated interaction.
pub async fn handle(verifier: &Verifier, interaction: Interaction) -> InteractionResponse {
    match interaction.kind {
        PING => InteractionResponse::pong(),
        APPLICATION_COMMAND => handle_command(&interaction),
        MESSAGE_COMPONENT => handle_component(verifier, &interaction).await,
        other => {
            debug!("Ignoring interaction of type {other}");
            InteractionResponse::ephemeral("Unsupported interaction.")
        }
    }
}

fn handle_command(interaction: &Interaction) -> InteractionResponse {
    let name = interaction.data.as_ref().and_then(|d| d.name.as_deref());
    if name != Some(SEND_VERIFY_COMMAND) {
        return InteractionResponse::ephemeral("Unknown command.");
    }

    let is_admin = interaction
        .member
        .as_ref()
        .is_some_and(InteractionMember::is_administrator);
    if !is_admin {
        return InteractionResponse::ephemeral(
            "You need Administrator permission to use this command.",
        );
    }

    info!(
        "Posting verification message in guild {}",
        interaction.guild_id.as_deref().unwrap_or("<dm>")
    );
    InteractionResponse::verification_prompt()
}

async fn handle_component(verifier: &Verifier, interaction: &Interaction) -> InteractionResponse {
    let custom_id = interaction.data.as_ref().and_then(|d| d.custom_id.as_deref());
    if custom_id != Some(VERIFY_BUTTON_ID) {
        return InteractionResponse::ephemeral("Unsupported interaction.");
    }

    let (Some(scope_id), Some(member)) = (&interaction.guild_id, &interaction.member) else {
        return InteractionResponse::ephemeral("Verification only works inside a server.");
    };

    match verifier
        .initiate(&member.user.id, scope_id, &member.roles)
        .await
    {
        Ok(Initiation::AlreadyVerified) => {
            InteractionResponse::ephemeral("✅ You are already verified!")
        }
        Ok(Initiation::Started { authorize_url, .. }) => {
            InteractionResponse::authorize_link(&authorize_url)
        }
        Err(e) => initiation_failure(e),
    }
}

fn initiation_failure(e: Error) -> InteractionResponse {
    match e.verification_kind() {
        Some(VerificationErrorKind::RolesNotConfigured) => InteractionResponse::ephemeral(
            "❌ Roles not set up properly. Ask an admin to run `/setup-verify`.",
        ),
        _ => {
            error!("Failed to start verification: {e}");
            InteractionResponse::ephemeral("❌ Could not start verification. Please try again.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role_set::RoleDirectory;
    use crate::test_support::{guild_one, FakePlatform, FakeProvider};
    use std::sync::Arc;
    use verify_auth::oauth::PendingStore;

    fn verifier(platform: FakePlatform) -> Verifier {
        Verifier::new(
            Arc::new(PendingStore::new()),
            Arc::new(FakeProvider::returning("U1", "alice")),
            Arc::new(platform),
            RoleDirectory::new("Unverified", "Verified"),
            vec![],
        )
    }

    fn parse(body: Value) -> Interaction {
        serde_json::from_value(body).unwrap()
    }

    fn button_press(roles: &[&str]) -> Interaction {
        parse(json!({
            "type": 3,
            "guild_id": "G1",
            "member": { "user": { "id": "U1", "username": "alice" }, "roles": roles, "permissions": "0" },
            "data": { "custom_id": "verify_button", "component_type": 2 }
        }))
    }

    fn content(response: &InteractionResponse) -> &str {
        response
            .data
            .as_ref()
            .and_then(|d| d.content.as_deref())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let verifier = verifier(FakePlatform::new());
        let response = handle(&verifier, parse(json!({ "type": 1 }))).await;

        assert_eq!(serde_json::to_value(&response).unwrap(), json!({ "type": 1 }));
    }

    #[tokio::test]
    async fn test_button_press_returns_authorize_link() {
        let verifier = verifier(FakePlatform::new().with_scope(guild_one()));
        let response = handle(&verifier, button_press(&["R1"])).await;

        let data = response.data.unwrap();
        assert_eq!(data.flags, Some(EPHEMERAL));
        let url = data.components[0]["components"][0]["url"].as_str().unwrap();
        assert!(url.starts_with("https://idp.test/authorize"));
        assert_eq!(verifier.store().len(), 1);
    }

    #[tokio::test]
    async fn test_button_press_already_verified() {
        let verifier = verifier(FakePlatform::new().with_scope(guild_one()));
        let response = handle(&verifier, button_press(&["R2"])).await;

        assert_eq!(content(&response), "✅ You are already verified!");
        assert!(verifier.store().is_empty());
    }

    #[tokio::test]
    async fn test_button_press_without_roles_set_up() {
        let verifier = verifier(FakePlatform::new());
        let response = handle(&verifier, button_press(&[])).await;

        assert!(content(&response).contains("/setup-verify"));
    }

    #[tokio::test]
    async fn test_send_verify_requires_administrator() {
        let verifier = verifier(FakePlatform::new());
        let response = handle(
            &verifier,
            parse(json!({
                "type": 2,
                "guild_id": "G1",
                "member": { "user": { "id": "U1" }, "roles": [], "permissions": "2048" },
                "data": { "name": "send-verify" }
            })),
        )
        .await;

        assert_eq!(
            content(&response),
            "You need Administrator permission to use this command."
        );
    }

    #[tokio::test]
    async fn test_send_verify_posts_prompt() {
        let verifier = verifier(FakePlatform::new());
        let response = handle(
            &verifier,
            parse(json!({
                "type": 2,
                "guild_id": "G1",
                "member": { "user": { "id": "U1" }, "roles": [], "permissions": "8" },
                "data": { "name": "send-verify" }
            })),
        )
        .await;

        let data = response.data.unwrap();
        assert_eq!(data.flags, None);
        assert_eq!(
            data.components[0]["components"][0]["custom_id"],
            json!(VERIFY_BUTTON_ID)
        );
    }
}
