use std::{sync::Arc, time::Duration};

use bolt_common::Money;
use bolt_engine::{
    db_types::User,
    debts::{run_reminders, DebtApi, DebtTaskRegistry, ReminderTick, DEBT_TIMEOUT_REASON, MARK_PAID_REACTION},
    rates::{GroupRate, Rate},
    test_utils::{
        fakes::{user, MemoryDirectory, RecordingNotifier},
        prepare_env::prepare_test_env,
    },
    traits::DebtManagement,
    SqliteDatabase,
};
use chrono::{DateTime, TimeZone, Utc};
use tokio_util::sync::CancellationToken;

const ORDER_ID: &str = "Q7W8";
const CHANNEL: &str = "C-lunch";
const THREAD: &str = "1700000000.000100";

type Api = DebtApi<SqliteDatabase, RecordingNotifier, MemoryDirectory>;

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}

fn night() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 22, 30, 0).unwrap()
}

fn small_hours() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 16, 1, 0, 0).unwrap()
}

async fn setup() -> (Api, Arc<RecordingNotifier>) {
    let db = prepare_test_env().await;
    let notifier = Arc::new(RecordingNotifier::new());
    (DebtApi::new(db, Arc::clone(&notifier), Arc::new(users())), notifier)
}

fn rate(label: &str, known: Option<User>, minor: i64) -> Rate {
    Rate { label: label.to_string(), user: known, amount: Money::from_minor(minor) }
}

fn group_rate(directory: &MemoryDirectory) -> GroupRate {
    let find = |id: &str| directory.users.iter().find(|u| u.id == id).cloned();
    GroupRate {
        rates: vec![
            rate("Alice", find("u-alice"), 2500),
            rate("Bob", find("u-bob"), 500),
            rate("Dana", find("u-dana"), 1250),
            rate("Eve", None, 900),
        ],
        host: "Bob".to_string(),
        host_user: find("u-bob"),
        delivery_fee: 10,
    }
}

fn users() -> MemoryDirectory {
    let mut dana = user("u-dana", "Dana", "UD");
    dana.timezone = "Asia/Tokyo".to_string();
    MemoryDirectory::new(vec![user("u-alice", "Alice", "UA"), user("u-bob", "Bob", "UB"), dana])
}

#[tokio::test]
async fn tracking_skips_the_host_and_unknown_people() {
    let (api, notifier) = setup().await;
    let count = api.start_tracking(ORDER_ID, &group_rate(&users()), CHANNEL, THREAD).await.unwrap();
    assert_eq!(count, 2);
    let debts = api.db().list_debts_for_order(ORDER_ID).await.unwrap();
    let mut borrowers = debts.iter().map(|d| d.borrower_id.as_str()).collect::<Vec<_>>();
    borrowers.sort();
    assert_eq!(borrowers, vec!["u-alice", "u-dana"]);
    assert!(debts.iter().all(|d| d.lender_id == "u-bob" && d.thread_ts == THREAD && d.initial_transport == CHANNEL));

    assert_eq!(notifier.count_containing("as the host, you can react with :x:"), 1);
    assert_eq!(notifier.count_containing("I won't track \"Eve\" payment because I can't find their user."), 1);
    assert!(notifier.sent().iter().all(|m| m.receiver == CHANNEL && m.in_reply_to.as_deref() == Some(THREAD)));
}

#[tokio::test]
async fn reminders_respect_quiet_hours() {
    let (api, notifier) = setup().await;
    api.start_tracking(ORDER_ID, &group_rate(&users()), CHANNEL, THREAD).await.unwrap();

    // Noon in UTC is 21:00 in Tokyo
    let tick = api.remind_debts(ORDER_ID, noon()).await.unwrap();
    assert_eq!(tick, ReminderTick { live: 2, reminded: 1, quiet: 1 });
    let reminders = notifier.sent_to("UA");
    assert_eq!(reminders.len(), 1);
    assert_eq!(
        reminders[0].text,
        "Reminder, you should pay 25.00 nis to <@UB> for Wolt order ID Q7W8.\nIf you paid, you can mark yourself as \
         paid by adding :money_mouth_face: reaction to this message \\ the original rates message."
    );
    assert!(notifier
        .reactions()
        .iter()
        .any(|r| r.message_id == reminders[0].id && r.reaction == MARK_PAID_REACTION && r.receiver == "UA"));
    assert!(notifier.sent_to("UD").is_empty());

    // 22:30 UTC is 07:30 in Tokyo, still too early. Alice is in quiet hours now too.
    let tick = api.remind_debts(ORDER_ID, night()).await.unwrap();
    assert_eq!(tick, ReminderTick { live: 2, reminded: 0, quiet: 2 });
    assert_eq!(notifier.sent_to("UA").len(), 1);

    // 01:00 UTC is 10:00 in Tokyo, so Dana finally hears about it
    let tick = api.remind_debts(ORDER_ID, small_hours()).await.unwrap();
    assert_eq!(tick, ReminderTick { live: 2, reminded: 1, quiet: 1 });
    let reminders = notifier.sent_to("UD");
    assert_eq!(reminders.len(), 1);
    assert!(reminders[0].text.starts_with("Reminder, you should pay 12.50 nis to <@UB> for Wolt order ID Q7W8."));
    assert_eq!(notifier.sent_to("UA").len(), 1);
}

#[tokio::test]
async fn debts_expire_after_the_maximum_duration() {
    let (api, notifier) = setup().await;
    api.start_tracking(ORDER_ID, &group_rate(&users()), CHANNEL, THREAD).await.unwrap();
    let token = CancellationToken::new();
    let task = run_reminders(api.clone(), ORDER_ID.to_string(), Duration::from_secs(3600), Duration::from_millis(50), token);
    tokio::time::timeout(Duration::from_secs(5), task).await.expect("reminders did not stop");

    assert!(api.db().list_debts_for_order(ORDER_ID).await.unwrap().is_empty());
    let to_host = notifier.sent_to("UB");
    assert_eq!(to_host.len(), 1);
    assert_eq!(to_host[0].text, format!("I removed all debts for order ID {ORDER_ID} because {DEBT_TIMEOUT_REASON}"));
}

#[tokio::test]
async fn draining_the_registry_leaves_debts_alone() {
    let (api, _notifier) = setup().await;
    api.start_tracking(ORDER_ID, &group_rate(&users()), CHANNEL, THREAD).await.unwrap();
    let registry = DebtTaskRegistry::new();
    let task_api = api.clone();
    assert!(registry.spawn(ORDER_ID, move |token| {
        run_reminders(task_api, ORDER_ID.to_string(), Duration::from_secs(3600), Duration::from_secs(3600), token)
    }));
    assert!(!registry.spawn(ORDER_ID, |_token| async {}));
    assert!(registry.is_tracking(ORDER_ID));

    assert_eq!(registry.drain().await, 1);
    assert_eq!(registry.active_count(), 0);
    assert_eq!(api.db().list_debts_for_order(ORDER_ID).await.unwrap().len(), 2);
}

#[tokio::test]
async fn reminders_stop_once_everyone_paid() {
    let (api, notifier) = setup().await;
    api.start_tracking(ORDER_ID, &group_rate(&users()), CHANNEL, THREAD).await.unwrap();
    assert!(api.mark_paid(ORDER_ID, "UA").await.unwrap());
    assert!(api.mark_paid(ORDER_ID, "UD").await.unwrap());
    assert!(!api.mark_paid(ORDER_ID, "UB").await.unwrap());
    assert_eq!(notifier.count_containing("marked themselves as paid for order ID Q7W8"), 2);

    let token = CancellationToken::new();
    let task =
        run_reminders(api.clone(), ORDER_ID.to_string(), Duration::from_millis(20), Duration::from_secs(3600), token);
    tokio::time::timeout(Duration::from_secs(5), task).await.expect("reminders did not stop");
}

#[tokio::test]
async fn paid_notice_goes_to_the_order_thread_when_the_lender_is_unknown() {
    let db = prepare_test_env().await;
    let notifier = Arc::new(RecordingNotifier::new());
    let everyone = users();
    // Bob hosts, but has since left the directory
    let without_host = MemoryDirectory::new(everyone.users.iter().filter(|u| u.id != "u-bob").cloned().collect());
    let api = DebtApi::new(db, Arc::clone(&notifier), Arc::new(without_host));
    api.start_tracking(ORDER_ID, &group_rate(&everyone), CHANNEL, THREAD).await.unwrap();

    assert!(api.mark_paid(ORDER_ID, "UA").await.unwrap());
    assert_eq!(notifier.sent_to("UA").last().unwrap().text, "OK! I removed your debt for order Q7W8");
    let notice = notifier
        .sent()
        .into_iter()
        .find(|m| m.text == "<@UA> marked themselves as paid for order ID Q7W8")
        .expect("the lender was not told");
    assert_eq!(notice.receiver, CHANNEL);
    assert_eq!(notice.in_reply_to.as_deref(), Some(THREAD));
    assert!(notifier.sent_to("UB").is_empty());
}
