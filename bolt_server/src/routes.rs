//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Slack also gives up on a request after three seconds, so handlers
//! never wait on a group order. Events are queued for the ingress workers and the handler returns straight away.
use actix_web::{get, post, web, HttpResponse, Responder};
use bolt_engine::{events::{EventProducer, LinkSharedEvent}, traits::UserManagement};
use log::*;

use crate::{
    config::ServerOptions,
    data_objects::{EventEnvelope, ReactionAddedPayload, SlackEvent, SlashCommand},
    errors::ServerError,
    helpers::split_command_args,
    integrations::slack::SlackWorkspace,
};

pub const ADD_USER_COMMAND: &str = "/add-user";
pub const ADD_USER_USAGE: &str = "USAGE: \"<name>\" @<user>";

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Events  ----------------------------------------------------
/// Entry point for the Slack Events API.
///
/// * `url_verification` requests are answered with their challenge.
/// * `link_shared` events are queued for the order coordinator. Links typed into the message composer are ignored,
///   since that message has not been sent yet.
/// * `reaction_added` events on messages are queued for the debt tracker.
///
/// Everything else is acknowledged and dropped. If a queue has no room for the event within the accept timeout, the
/// response is 429 and Slack will retry later.
#[post("/events")]
pub async fn events(
    body: web::Bytes,
    links: web::Data<EventProducer<LinkSharedEvent>>,
    reactions: web::Data<EventProducer<ReactionAddedPayload>>,
) -> Result<HttpResponse, ServerError> {
    let envelope = serde_json::from_slice::<EventEnvelope>(&body).map_err(|e| {
        debug!("💻️ Could not parse event payload. {e}");
        ServerError::InvalidRequestBody(e.to_string())
    })?;
    match envelope {
        EventEnvelope::UrlVerification { challenge } => {
            info!("💻️ Answering URL verification challenge");
            return Ok(HttpResponse::Ok().content_type("text/plain").body(challenge));
        },
        EventEnvelope::EventCallback { event: SlackEvent::LinkShared(payload) } => {
            if payload.is_from_composer() {
                trace!("💻️ Ignoring links in the message composer");
            } else {
                debug!("💻️ {} link(s) shared in {}", payload.links.len(), payload.channel);
                links.publish(payload.into()).await?;
            }
        },
        EventEnvelope::EventCallback { event: SlackEvent::ReactionAdded(payload) } => {
            if payload.item.is_message() {
                debug!("💻️ :{}: added to message {} by {}", payload.reaction, payload.item.ts, payload.user);
                reactions.publish(payload).await?;
            } else {
                trace!("💻️ Ignoring a reaction to a {}", payload.item.item_type);
            }
        },
        EventEnvelope::EventCallback { event: SlackEvent::Unsupported } | EventEnvelope::Unsupported => {
            trace!("💻️ Ignoring unsupported event");
        },
    }
    Ok(HttpResponse::Ok().finish())
}

//----------------------------------------------   Admin commands  ----------------------------------------------------
route!(add_user => Post "/add-user" impl UserManagement, SlackWorkspace);
/// Handler for the `/add-user "<name>" @<handle>` slash command.
///
/// Adds the Slack member with the given handle to the user store, under the name they use in group orders. Only the
/// admins in `BOLT_ADMIN_USER_IDS` may use it. The outcome is written to the response body, which Slack shows to the
/// admin who ran the command.
pub async fn add_user<B, S>(
    form: web::Form<SlashCommand>,
    db: web::Data<B>,
    slack: web::Data<S>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: UserManagement,
    S: SlackWorkspace,
{
    let command = form.into_inner();
    if !options.is_admin(&command.user_id) {
        warn!("💻️ {} tried to run {} without permission", command.user_id, command.command);
        return Err(ServerError::Unauthorized(format!("{} is not an admin", command.user_id)));
    }
    if command.command != ADD_USER_COMMAND {
        return Err(ServerError::InvalidRequestBody(format!("Unknown command {}", command.command)));
    }
    let args = split_command_args(&command.text).unwrap_or_default();
    let (name, handle) = match args.as_slice() {
        [name, handle] if handle.starts_with('@') => (name.as_str(), &handle[1..]),
        _ => {
            debug!("💻️ Bad arguments for {ADD_USER_COMMAND}: {}", command.text);
            return Ok(HttpResponse::Ok().body(ADD_USER_USAGE));
        },
    };
    let member = slack.find_member_by_handle(handle).await.map_err(|e| {
        warn!("💻️ Could not look up Slack member {handle}. {e}");
        e
    })?;
    let Some(member) = member else {
        info!("💻️ There is no Slack member called {handle}");
        return Ok(HttpResponse::Ok().body(format!("user \"{handle}\" not found")));
    };
    match db.add_user(member.to_new_user(name)).await {
        Ok(user) => {
            info!("💻️ Added user {} ({}) as {name}", user.id, user.transport_id);
            Ok(HttpResponse::Ok().body(format!("OK, got you. I added <@{}> as \"{name}\"", member.id)))
        },
        Err(e) => {
            warn!("💻️ Could not add {handle} as {name}. {e}");
            Ok(HttpResponse::Ok().body(format!("Error adding user: {e}")))
        },
    }
}
