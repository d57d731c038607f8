//! A thin client for the parts of the Slack Web API that the bot uses.
//!
//! [`SlackClient`] is the bot's chat transport (it implements [`Notifier`]) and the source of Slack member profiles.
//! [`SlackDirectory`] exposes the workspace's members as a [`UserDirectory`], for participants that are not in the
//! bot's own user store yet.
use std::sync::Arc;

use async_trait::async_trait;
use bolt_engine::{
    db_types::{NewUser, User},
    events::ReactionAddedEvent,
    traits::{Notifier, NotifierError, UserDirectory, UserDirectoryError},
};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{config::SlackConfig, data_objects::ReactionAddedPayload, errors::SlackApiError};

const USERS_PAGE_SIZE: &str = "200";

//--------------------------------------   Slack objects   ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackMember {
    pub id: String,
    /// The member's handle, as used in `@mentions`.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub tz: String,
    #[serde(default)]
    pub profile: SlackProfile,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackProfile {
    #[serde(default)]
    pub real_name: String,
    #[serde(default)]
    pub real_name_normalized: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

impl SlackMember {
    pub fn real_name(&self) -> &str {
        if self.profile.real_name_normalized.is_empty() {
            &self.profile.real_name
        } else {
            &self.profile.real_name_normalized
        }
    }

    /// A new user record for this member, known to the bot as `full_name`.
    pub fn to_new_user(&self, full_name: &str) -> NewUser {
        NewUser {
            full_name: full_name.to_string(),
            email: self.profile.email.clone(),
            phone: self.profile.phone.clone(),
            timezone: self.tz.clone(),
            transport_id: self.id.clone(),
            payment_preferences: Vec::new(),
        }
    }
}

impl From<SlackMember> for User {
    fn from(member: SlackMember) -> Self {
        User {
            full_name: member.real_name().to_string(),
            email: member.profile.email,
            phone: member.profile.phone,
            timezone: member.tz,
            transport_id: member.id.clone(),
            id: member.id,
            payment_preferences: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct UsersPage {
    #[serde(default)]
    members: Vec<SlackMember>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackMessage {
    #[serde(default)]
    text: String,
}

//--------------------------------------   SlackWorkspace   ---------------------------------------------------------
/// Workspace lookups needed while handling inbound requests.
#[async_trait]
pub trait SlackWorkspace: Send + Sync {
    /// The member whose handle is `handle` (without the `@`), if there is one.
    async fn find_member_by_handle(&self, handle: &str) -> Result<Option<SlackMember>, SlackApiError>;

    /// The text of the message at `ts` in `channel`.
    async fn message_text(&self, channel: &str, ts: &str) -> Result<String, SlackApiError>;
}

/// Completes a reaction event with the text of the message that was reacted to.
pub async fn resolve_reaction<S: SlackWorkspace + ?Sized>(
    slack: &S,
    payload: ReactionAddedPayload,
) -> Result<ReactionAddedEvent, SlackApiError> {
    let message_text = slack.message_text(&payload.item.channel, &payload.item.ts).await?;
    Ok(ReactionAddedEvent {
        reaction: payload.reaction,
        from_user: payload.user,
        channel: payload.item.channel,
        message_ts: payload.item.ts,
        message_author: payload.item_user,
        message_text,
    })
}

//--------------------------------------   SlackClient   ---------------------------------------------------------
#[derive(Clone)]
pub struct SlackClient {
    api_url: String,
    client: Arc<Client>,
}

impl SlackClient {
    pub fn new(config: &SlackConfig) -> Result<Self, SlackApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(&format!("Bearer {}", config.oauth_token.reveal()))
            .map_err(|e| SlackApiError::Request(e.to_string()))?;
        headers.insert(AUTHORIZATION, val);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        let client =
            Client::builder().default_headers(headers).build().map_err(|e| SlackApiError::Request(e.to_string()))?;
        Ok(Self { api_url: config.api_url.trim_end_matches('/').to_string(), client: Arc::new(client) })
    }

    pub fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.api_url)
    }

    /// Calls a Web API method. Read methods are sent as GET with query parameters, write methods as POST with a JSON
    /// body. Slack reports failures with `"ok": false` and a 200 status, so both are checked.
    async fn call<T: DeserializeOwned>(
        &self,
        http_method: Method,
        method: &str,
        params: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<T, SlackApiError> {
        let url = self.url(method);
        trace!("💬️ Calling {method}");
        let mut req = self.client.request(http_method, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| SlackApiError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SlackApiError::Status(response.status().as_u16()));
        }
        let result = response.json::<Value>().await.map_err(|e| SlackApiError::Json(e.to_string()))?;
        if !result["ok"].as_bool().unwrap_or(false) {
            let error = result["error"].as_str().unwrap_or("unknown_error").to_string();
            return Err(SlackApiError::Api { method: method.to_string(), error });
        }
        serde_json::from_value(result).map_err(|e| SlackApiError::Json(e.to_string()))
    }

    /// The member id of the bot itself.
    pub async fn auth_test(&self) -> Result<String, SlackApiError> {
        #[derive(Deserialize)]
        struct AuthTest {
            user_id: String,
        }
        let result = self.call::<AuthTest>(Method::POST, "auth.test", &[], None).await?;
        info!("💬️ Connected to Slack as {}", result.user_id);
        Ok(result.user_id)
    }

    pub async fn post_message(&self, channel: &str, text: &str, thread_ts: Option<&str>) -> Result<String, SlackApiError> {
        #[derive(Deserialize)]
        struct Posted {
            ts: String,
        }
        let mut body = json!({ "channel": channel, "text": text });
        if let Some(ts) = thread_ts {
            body["thread_ts"] = json!(ts);
        }
        let result = self.call::<Posted>(Method::POST, "chat.postMessage", &[], Some(body)).await?;
        Ok(result.ts)
    }

    pub async fn update_message(&self, channel: &str, ts: &str, text: &str) -> Result<(), SlackApiError> {
        let body = json!({ "channel": channel, "ts": ts, "text": text });
        self.call::<Value>(Method::POST, "chat.update", &[], Some(body)).await?;
        Ok(())
    }

    pub async fn post_reaction(&self, channel: &str, ts: &str, name: &str) -> Result<(), SlackApiError> {
        let body = json!({ "channel": channel, "timestamp": ts, "name": name });
        self.call::<Value>(Method::POST, "reactions.add", &[], Some(body)).await?;
        Ok(())
    }

    pub async fn user_info(&self, id: &str) -> Result<SlackMember, SlackApiError> {
        #[derive(Deserialize)]
        struct UserInfo {
            user: SlackMember,
        }
        let result = self.call::<UserInfo>(Method::GET, "users.info", &[("user", id)], None).await?;
        Ok(result.user)
    }

    /// Every member of the workspace, following the pagination cursor to the end.
    pub async fn list_members(&self) -> Result<Vec<SlackMember>, SlackApiError> {
        let mut members = vec![];
        let mut cursor = String::new();
        loop {
            let mut params = vec![("limit", USERS_PAGE_SIZE)];
            if !cursor.is_empty() {
                params.push(("cursor", cursor.as_str()));
            }
            let page = self.call::<UsersPage>(Method::GET, "users.list", &params, None).await?;
            members.extend(page.members);
            match page.response_metadata.map(|m| m.next_cursor).filter(|c| !c.is_empty()) {
                Some(next) => cursor = next,
                None => break,
            }
        }
        trace!("💬️ Fetched {} workspace members", members.len());
        Ok(members)
    }
}

#[async_trait]
impl SlackWorkspace for SlackClient {
    async fn find_member_by_handle(&self, handle: &str) -> Result<Option<SlackMember>, SlackApiError> {
        let members = self.list_members().await?;
        Ok(members.into_iter().find(|m| m.name == handle))
    }

    async fn message_text(&self, channel: &str, ts: &str) -> Result<String, SlackApiError> {
        #[derive(Deserialize)]
        struct Replies {
            #[serde(default)]
            messages: Vec<SlackMessage>,
        }
        let params = [("channel", channel), ("ts", ts), ("limit", "1")];
        let result = self.call::<Replies>(Method::GET, "conversations.replies", &params, None).await?;
        result
            .messages
            .into_iter()
            .next()
            .map(|m| m.text)
            .ok_or_else(|| SlackApiError::Missing(format!("No message at {ts} in {channel}")))
    }
}

#[async_trait]
impl Notifier for SlackClient {
    async fn send_message(&self, receiver: &str, text: &str, in_reply_to: Option<&str>) -> Result<String, NotifierError> {
        self.post_message(receiver, text, in_reply_to)
            .await
            .map_err(|e| NotifierError::SendFailed { receiver: receiver.to_string(), reason: e.to_string() })
    }

    async fn edit_message(&self, receiver: &str, text: &str, message_id: &str) -> Result<(), NotifierError> {
        self.update_message(receiver, message_id, text)
            .await
            .map_err(|e| NotifierError::EditFailed { message_id: message_id.to_string(), reason: e.to_string() })
    }

    async fn add_reaction(&self, receiver: &str, message_id: &str, reaction: &str) -> Result<(), NotifierError> {
        self.post_reaction(receiver, message_id, reaction)
            .await
            .map_err(|e| NotifierError::ReactionFailed { message_id: message_id.to_string(), reason: e.to_string() })
    }
}

//--------------------------------------   SlackDirectory   ---------------------------------------------------------
/// Resolves participant names against the real names of the workspace's members.
#[derive(Clone)]
pub struct SlackDirectory {
    client: SlackClient,
}

impl SlackDirectory {
    pub fn new(client: SlackClient) -> Self {
        Self { client }
    }
}

/// Active members whose real name is `name`, ignoring case.
pub fn members_named(members: Vec<SlackMember>, name: &str) -> Vec<User> {
    let name = name.trim();
    members
        .into_iter()
        .filter(|m| !m.deleted && m.real_name().trim().eq_ignore_ascii_case(name))
        .map(User::from)
        .collect()
}

#[async_trait]
impl UserDirectory for SlackDirectory {
    async fn find_by_name(&self, name: &str) -> Result<Vec<User>, UserDirectoryError> {
        let members = self.client.list_members().await.map_err(|e| UserDirectoryError::LookupFailed(e.to_string()))?;
        let users = members_named(members, name);
        debug!("📇️ {} Slack members are called {name}", users.len());
        Ok(users)
    }

    async fn get_user(&self, id: &str) -> Result<User, UserDirectoryError> {
        match self.client.user_info(id).await {
            Ok(member) => Ok(User::from(member)),
            Err(SlackApiError::Api { error, .. }) if error == "user_not_found" => {
                Err(UserDirectoryError::NotFound(id.to_string()))
            },
            Err(e) => Err(UserDirectoryError::LookupFailed(e.to_string())),
        }
    }
}
