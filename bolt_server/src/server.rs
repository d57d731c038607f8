use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use bolt_engine::{
    debts::DebtTaskRegistry,
    directory::{CombinedDirectory, ProfileCache},
    events::{EventDispatcher, EventProducer, Handler, LinkSharedEvent},
    traits::{StoreDirectory, WoltProvider},
    CoordinatorConfig,
    OrderCoordinator,
    SqliteDatabase,
};
use log::*;
use tokio_util::sync::CancellationToken;
use wolt_tools::WoltConfig;

use crate::{
    config::{ServerConfig, ServerOptions},
    data_objects::ReactionAddedPayload,
    errors::ServerError,
    integrations::slack::{resolve_reaction, SlackClient, SlackDirectory},
    middleware::SlackSignatureFactory,
    routes::{events, health, AddUserRoute},
};

const MAX_DB_CONNECTIONS: u32 = 25;

pub type BoltDirectory = ProfileCache<CombinedDirectory<StoreDirectory<SqliteDatabase>, SlackDirectory>>;
pub type Coordinator = OrderCoordinator<WoltProvider, SlackClient, SqliteDatabase, BoltDirectory>;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, MAX_DB_CONNECTIONS)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let slack = SlackClient::new(&config.slack)?;
    let self_id = slack
        .auth_test()
        .await
        .map_err(|e| ServerError::InitializeError(format!("Could not identify the bot on Slack. {e}")))?;

    let shutdown = CancellationToken::new();
    let registry = DebtTaskRegistry::new();
    let coordinator = Arc::new(build_coordinator(&db, &slack, &self_id, registry.clone(), shutdown.clone()));

    let ingress = config.ingress;
    let link_dispatcher = EventDispatcher::new(
        "link",
        ingress.queue_size,
        ingress.workers,
        ingress.accept_timeout,
        link_handler(Arc::clone(&coordinator)),
    );
    let reaction_dispatcher = EventDispatcher::new(
        "reaction",
        ingress.queue_size,
        ingress.workers,
        ingress.accept_timeout,
        reaction_handler(Arc::clone(&coordinator), slack.clone(), self_id),
    );
    let links = link_dispatcher.subscribe();
    let reactions = reaction_dispatcher.subscribe();
    let link_workers = tokio::spawn(link_dispatcher.start_workers(shutdown.clone()));
    let reaction_workers = tokio::spawn(reaction_dispatcher.start_workers(shutdown.clone()));

    let srv = create_server_instance(config, db, slack, links, reactions)?;
    let handle = srv.handle();
    let stop_signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("💻️ Shutdown requested"),
            Err(e) => error!("💻️ Could not listen for the shutdown signal. {e}"),
        }
        stop_signal.cancel();
        handle.stop(true).await;
    });

    let result = srv.await.map_err(ServerError::from);
    shutdown.cancel();
    for workers in [link_workers, reaction_workers] {
        if let Err(e) = workers.await {
            warn!("💻️ Event workers did not shut down cleanly. {e}");
        }
    }
    let drained = registry.drain().await;
    info!("💻️ Stopped {drained} debt reminder task(s)");
    result
}

fn build_coordinator(
    db: &SqliteDatabase,
    slack: &SlackClient,
    self_id: &str,
    registry: DebtTaskRegistry,
    shutdown: CancellationToken,
) -> Coordinator {
    let config = CoordinatorConfig::from_env_or_default();
    let directory = ProfileCache::new(
        CombinedDirectory::new(StoreDirectory::new(db.clone()), SlackDirectory::new(slack.clone())),
        config.profile_cache_max_age,
    );
    let provider = WoltProvider::new(WoltConfig::new_from_env_or_default());
    OrderCoordinator::new(
        config,
        provider,
        Arc::new(slack.clone()),
        db.clone(),
        Arc::new(directory),
        self_id,
        registry,
        shutdown,
    )
}

fn link_handler(coordinator: Arc<Coordinator>) -> Handler<LinkSharedEvent> {
    Arc::new(move |event: LinkSharedEvent| {
        let coordinator = Arc::clone(&coordinator);
        Box::pin(async move {
            let outcome = coordinator.handle_link_shared(event).await;
            debug!("💻️ Link event handled: {outcome:?}");
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    })
}

fn reaction_handler(coordinator: Arc<Coordinator>, slack: SlackClient, self_id: String) -> Handler<ReactionAddedPayload> {
    Arc::new(move |payload: ReactionAddedPayload| {
        let coordinator = Arc::clone(&coordinator);
        let slack = slack.clone();
        let self_id = self_id.clone();
        Box::pin(async move {
            // only the bot's own messages carry order ids, so skip the lookup for everything else
            if payload.item_user != self_id {
                trace!("💻️ Ignoring :{}: on a message from {}", payload.reaction, payload.item_user);
                return;
            }
            match resolve_reaction(&slack, payload).await {
                Ok(event) => {
                    let outcome = coordinator.handle_reaction_added(event).await;
                    debug!("💻️ Reaction event handled: {outcome:?}");
                },
                Err(e) => warn!("💻️ Could not fetch the message that was reacted to. {e}"),
            }
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    })
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    slack: SlackClient,
    links: EventProducer<LinkSharedEvent>,
    reactions: EventProducer<ReactionAddedPayload>,
) -> Result<Server, ServerError> {
    let options = ServerOptions::from_config(&config);
    let signing_secret = config.slack.signing_secret.clone();
    let verify_signatures = !config.disable_signature_verification;
    let srv = HttpServer::new(move || {
        // Everything Slack calls must carry a valid signature
        let slack_scope = web::scope("")
            .wrap(SlackSignatureFactory::new(signing_secret.clone(), verify_signatures))
            .service(events)
            .service(AddUserRoute::<SqliteDatabase, SlackClient>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("bolt::access_log"))
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(slack.clone()))
            .app_data(web::Data::new(options.clone()))
            .app_data(web::Data::new(links.clone()))
            .app_data(web::Data::new(reactions.clone()))
            .service(health)
            .service(slack_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .disable_signals()
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
