//! Request payloads that Slack sends to the server.
use bolt_engine::events::{LinkSharedEvent, SharedLink};
use serde::{Deserialize, Serialize};

/// Links posted in the message composer, before the message is sent, are reported with this channel.
pub const COMPOSER_CHANNEL: &str = "COMPOSER";

//--------------------------------------   Events API   ---------------------------------------------------------
/// The outer envelope of every Events API request.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEnvelope {
    /// Sent once, when the events URL is configured in the Slack app.
    UrlVerification { challenge: String },
    EventCallback { event: SlackEvent },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEvent {
    LinkShared(LinkSharedPayload),
    ReactionAdded(ReactionAddedPayload),
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkSharedPayload {
    pub channel: String,
    #[serde(default)]
    pub user: String,
    pub message_ts: String,
    #[serde(default)]
    pub links: Vec<LinkPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkPayload {
    pub domain: String,
    pub url: String,
}

impl LinkSharedPayload {
    pub fn is_from_composer(&self) -> bool {
        self.channel == COMPOSER_CHANNEL
    }
}

impl From<LinkSharedPayload> for LinkSharedEvent {
    fn from(value: LinkSharedPayload) -> Self {
        let links = value.links.into_iter().map(|l| SharedLink::new(l.domain, l.url)).collect();
        Self { channel: value.channel, message_ts: value.message_ts, links }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReactionAddedPayload {
    /// Who reacted.
    pub user: String,
    pub reaction: String,
    /// Who wrote the message that was reacted to.
    #[serde(default)]
    pub item_user: String,
    pub item: ReactionItem,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReactionItem {
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub ts: String,
}

impl ReactionItem {
    pub fn is_message(&self) -> bool {
        self.item_type == "message" && !self.channel.is_empty() && !self.ts.is_empty()
    }
}

//--------------------------------------   Slash commands   ---------------------------------------------------------
/// The form Slack posts when someone runs a slash command. Only the fields the server uses are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlashCommand {
    pub command: String,
    #[serde(default)]
    pub text: String,
    pub user_id: String,
    #[serde(default)]
    pub channel_id: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn url_verification() {
        let json = r#"{"token":"Jhj5dZrVaK7ZwHHjRyZWjbDl","challenge":"3eZbrw1aB","type":"url_verification"}"#;
        let envelope: EventEnvelope = serde_json::from_str(json).unwrap();
        assert!(matches!(envelope, EventEnvelope::UrlVerification { challenge } if challenge == "3eZbrw1aB"));
    }

    #[test]
    fn link_shared() {
        let json = r#"{
            "token": "XXYYZZ",
            "team_id": "TXXXXXXXX",
            "type": "event_callback",
            "event": {
                "type": "link_shared",
                "channel": "C123ABC456",
                "is_bot_user_member": true,
                "user": "U123ABC456",
                "message_ts": "1721074220.123456",
                "unfurl_id": "C123ABC456.1721074220.123456",
                "source": "conversations_history",
                "links": [
                    { "domain": "wolt.com", "url": "https://wolt.com/en/group-order/AB12CD34/join" },
                    { "domain": "example.com", "url": "https://example.com/menu" }
                ]
            },
            "event_id": "Ev08MFMKH6",
            "event_time": 123456789
        }"#;
        let envelope: EventEnvelope = serde_json::from_str(json).unwrap();
        let EventEnvelope::EventCallback { event: SlackEvent::LinkShared(payload) } = envelope else {
            panic!("Expected a link_shared callback");
        };
        assert!(!payload.is_from_composer());
        let event = LinkSharedEvent::from(payload);
        assert_eq!(event.channel, "C123ABC456");
        assert_eq!(event.message_ts, "1721074220.123456");
        assert_eq!(event.links.len(), 2);
        assert_eq!(event.links[0], SharedLink::new("wolt.com", "https://wolt.com/en/group-order/AB12CD34/join"));
    }

    #[test]
    fn reaction_added() {
        let json = r#"{
            "type": "event_callback",
            "event": {
                "type": "reaction_added",
                "user": "U024BE7LH",
                "reaction": "money_mouth_face",
                "item_user": "U0G9QF9C6",
                "item": { "type": "message", "channel": "C0G9QF9GZ", "ts": "1360782400.498405" },
                "event_ts": "1360782804.083113"
            }
        }"#;
        let envelope: EventEnvelope = serde_json::from_str(json).unwrap();
        let EventEnvelope::EventCallback { event: SlackEvent::ReactionAdded(payload) } = envelope else {
            panic!("Expected a reaction_added callback");
        };
        assert_eq!(payload.reaction, "money_mouth_face");
        assert_eq!(payload.item_user, "U0G9QF9C6");
        assert!(payload.item.is_message());
    }

    #[test]
    fn unsupported_events_are_tolerated() {
        let json = r#"{"type":"event_callback","event":{"type":"app_mention","user":"U1","text":"hi"}}"#;
        let envelope: EventEnvelope = serde_json::from_str(json).unwrap();
        assert!(matches!(envelope, EventEnvelope::EventCallback { event: SlackEvent::Unsupported }));
        let envelope: EventEnvelope = serde_json::from_str(r#"{"type":"app_rate_limited"}"#).unwrap();
        assert!(matches!(envelope, EventEnvelope::Unsupported));
    }
}
