use std::time::Duration;

use actix_web::{http::StatusCode, web, web::ServiceConfig};
use bolt_common::Secret;
use bolt_engine::events::{EventProducer, LinkSharedEvent, SharedLink};
use tokio::sync::mpsc;

use super::helpers::{post_json, signed_headers, SIGNING_SECRET};
use crate::{data_objects::ReactionAddedPayload, middleware::SlackSignatureFactory, routes::events};

const GROUP_LINK: &str = "https://wolt.com/en/group-order/AB12CD34/join";

struct Queues {
    links: mpsc::Receiver<LinkSharedEvent>,
    reactions: mpsc::Receiver<ReactionAddedPayload>,
    link_producer: EventProducer<LinkSharedEvent>,
    reaction_producer: EventProducer<ReactionAddedPayload>,
}

fn queues(size: usize) -> Queues {
    let (link_tx, links) = mpsc::channel(size);
    let (reaction_tx, reactions) = mpsc::channel(size);
    Queues {
        links,
        reactions,
        link_producer: EventProducer::new(link_tx, Duration::from_millis(50)),
        reaction_producer: EventProducer::new(reaction_tx, Duration::from_millis(50)),
    }
}

fn configure(
    links: EventProducer<LinkSharedEvent>,
    reactions: EventProducer<ReactionAddedPayload>,
    verify: bool,
) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(links)).app_data(web::Data::new(reactions)).service(
            web::scope("")
                .wrap(SlackSignatureFactory::new(Secret::new(SIGNING_SECRET.to_string()), verify))
                .service(events),
        );
    }
}

fn link_shared(channel: &str) -> String {
    serde_json::json!({
        "type": "event_callback",
        "event": {
            "type": "link_shared",
            "channel": channel,
            "user": "U123ABC456",
            "message_ts": "1721074220.123456",
            "links": [{ "domain": "wolt.com", "url": GROUP_LINK }]
        }
    })
    .to_string()
}

fn reaction_added(item_type: &str) -> String {
    serde_json::json!({
        "type": "event_callback",
        "event": {
            "type": "reaction_added",
            "user": "U024BE7LH",
            "reaction": "money_mouth_face",
            "item_user": "UBOT",
            "item": { "type": item_type, "channel": "C0G9QF9GZ", "ts": "1360782400.498405" }
        }
    })
    .to_string()
}

#[actix_web::test]
async fn url_verification_returns_the_challenge() {
    let _ = env_logger::try_init().ok();
    let q = queues(4);
    let body = r#"{"token":"Jhj5dZrVaK7ZwHHjRyZWjbDl","challenge":"3eZbrw1aB","type":"url_verification"}"#;
    let (status, text) =
        post_json("/events", body, signed_headers(body), configure(q.link_producer, q.reaction_producer, true)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "3eZbrw1aB");
}

#[actix_web::test]
async fn shared_links_are_queued() {
    let mut q = queues(4);
    let body = link_shared("C123ABC456");
    let (status, _) =
        post_json("/events", &body, signed_headers(&body), configure(q.link_producer, q.reaction_producer, true)).await;
    assert_eq!(status, StatusCode::OK);
    let event = q.links.try_recv().expect("Expected a queued link event");
    assert_eq!(event.channel, "C123ABC456");
    assert_eq!(event.message_ts, "1721074220.123456");
    assert_eq!(event.links, vec![SharedLink::new("wolt.com", GROUP_LINK)]);
    assert!(q.reactions.try_recv().is_err());
}

#[actix_web::test]
async fn links_in_the_composer_are_ignored() {
    let mut q = queues(4);
    let body = link_shared("COMPOSER");
    let (status, _) =
        post_json("/events", &body, signed_headers(&body), configure(q.link_producer, q.reaction_producer, true)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(q.links.try_recv().is_err());
}

#[actix_web::test]
async fn reactions_to_messages_are_queued() {
    let mut q = queues(4);
    let body = reaction_added("message");
    let (status, _) =
        post_json("/events", &body, signed_headers(&body), configure(q.link_producer, q.reaction_producer, true)).await;
    assert_eq!(status, StatusCode::OK);
    let payload = q.reactions.try_recv().expect("Expected a queued reaction");
    assert_eq!(payload.reaction, "money_mouth_face");
    assert_eq!(payload.item.ts, "1360782400.498405");

    let body = reaction_added("file");
    let q2 = queues(4);
    let mut reactions = q2.reactions;
    let (status, _) =
        post_json("/events", &body, signed_headers(&body), configure(q2.link_producer, q2.reaction_producer, true))
            .await;
    assert_eq!(status, StatusCode::OK);
    assert!(reactions.try_recv().is_err());
}

#[actix_web::test]
async fn full_queue_means_too_many_requests() {
    let mut q = queues(1);
    q.link_producer.publish(LinkSharedEvent { channel: "C1".into(), message_ts: "1.1".into(), links: vec![] }).await.unwrap();
    let body = link_shared("C123ABC456");
    let (status, _) =
        post_json("/events", &body, signed_headers(&body), configure(q.link_producer, q.reaction_producer, true)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    // only the event that was already there
    assert_eq!(q.links.try_recv().unwrap().channel, "C1");
    assert!(q.links.try_recv().is_err());
}

#[actix_web::test]
async fn other_events_are_acknowledged() {
    let q = queues(4);
    let body = r#"{"type":"event_callback","event":{"type":"app_mention","user":"U1","text":"hi"}}"#;
    let (status, _) =
        post_json("/events", body, signed_headers(body), configure(q.link_producer, q.reaction_producer, true)).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn garbage_is_a_bad_request() {
    let q = queues(4);
    let body = "{ this is not json";
    let (status, _) =
        post_json("/events", body, signed_headers(body), configure(q.link_producer, q.reaction_producer, true)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn missing_signature_headers() {
    let mut q = queues(4);
    let body = link_shared("C123ABC456");
    let (status, _) = post_json("/events", &body, vec![], configure(q.link_producer, q.reaction_producer, true)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(q.links.try_recv().is_err());
}

#[actix_web::test]
async fn invalid_signature() {
    let mut q = queues(4);
    let body = link_shared("C123ABC456");
    // signed for a different body
    let headers = signed_headers(&link_shared("C999"));
    let (status, _) = post_json("/events", &body, headers, configure(q.link_producer, q.reaction_producer, true)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(q.links.try_recv().is_err());
}

#[actix_web::test]
async fn stale_signature() {
    let q = queues(4);
    let body = link_shared("C123ABC456");
    let timestamp = (chrono::Utc::now().timestamp() - 6 * 60).to_string();
    let signature = crate::helpers::calculate_signature(SIGNING_SECRET, &timestamp, body.as_bytes());
    let headers = vec![("X-Slack-Request-Timestamp", timestamp), ("X-Slack-Signature", signature)];
    let (status, _) = post_json("/events", &body, headers, configure(q.link_producer, q.reaction_producer, true)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn verification_can_be_disabled() {
    let mut q = queues(4);
    let body = link_shared("C123ABC456");
    let (status, _) = post_json("/events", &body, vec![], configure(q.link_producer, q.reaction_producer, false)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(q.links.try_recv().is_ok());
}
