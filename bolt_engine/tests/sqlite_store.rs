use bolt_common::Money;
use bolt_engine::{
    db_types::{NewDebt, NewOrderRecord, NewUser, OrderParticipant, PaymentMethod, RecordStatus, UserQueryFilter},
    test_utils::prepare_env::prepare_test_env,
    traits::{DebtManagement, DebtManagementError, OrderManagement, UserManagement, UserManagementError},
};
use chrono::Utc;

fn new_user(name: &str, transport_id: &str) -> NewUser {
    NewUser {
        full_name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        transport_id: transport_id.to_string(),
        timezone: "Asia/Jerusalem".to_string(),
        payment_preferences: vec![PaymentMethod::Paybox, PaymentMethod::Bit],
        ..Default::default()
    }
}

fn new_debt(order_id: &str, borrower: &str, minor: i64) -> NewDebt {
    NewDebt {
        borrower_id: borrower.to_string(),
        lender_id: "lender".to_string(),
        order_id: order_id.to_string(),
        amount: Money::from_minor(minor),
        initial_transport: "C-lunch".to_string(),
        thread_ts: "1.1".to_string(),
    }
}

#[tokio::test]
async fn users() {
    let db = prepare_test_env().await;
    let alice = db.add_user(new_user("Alice Cohen", "UA")).await.unwrap();
    db.add_user(new_user("Bob Levi", "UB")).await.unwrap();
    db.add_user(new_user("Alice Cohen", "UA2")).await.unwrap();
    assert_eq!(alice.payment_preferences, vec![PaymentMethod::Paybox, PaymentMethod::Bit]);

    let err = db.add_user(new_user("Someone Else", "UA")).await.unwrap_err();
    assert!(matches!(err, UserManagementError::DuplicateUser(id) if id == "UA"));

    assert_eq!(db.get_user(&alice.id).await.unwrap(), alice);
    assert!(matches!(db.get_user("nobody").await, Err(UserManagementError::UserNotFound(_))));

    let alices = db.list_users(UserQueryFilter::default().with_name("Alice Cohen")).await.unwrap();
    assert_eq!(alices.len(), 2);
    let both = db.list_users(UserQueryFilter::default().with_name("Alice Cohen").with_name("Bob Levi")).await.unwrap();
    assert_eq!(both.len(), 3);
    let by_transport = db.list_users(UserQueryFilter::default().with_transport_id("UB")).await.unwrap();
    assert_eq!(by_transport.len(), 1);
    assert_eq!(by_transport[0].full_name, "Bob Levi");
    assert_eq!(db.list_users(UserQueryFilter::default()).await.unwrap().len(), 3);
    assert!(db.list_users(UserQueryFilter::default().with_name("Carol")).await.unwrap().is_empty());
}

#[tokio::test]
async fn debts() {
    let db = prepare_test_env().await;
    let first = db.add_debt(new_debt("ORD1", "alice", 2500)).await.unwrap();
    db.add_debt(new_debt("ORD1", "dana", 1250)).await.unwrap();
    db.add_debt(new_debt("ORD2", "alice", 700)).await.unwrap();

    let debts = db.list_debts_for_order("ORD1").await.unwrap();
    assert_eq!(debts.len(), 2);
    assert_eq!(debts[0], first);
    assert_eq!(debts[1].borrower_id, "dana");
    assert_eq!(debts[1].amount, Money::from_minor(1250));

    db.remove_debt_in_order("ORD1", &first.id).await.unwrap();
    let err = db.remove_debt_in_order("ORD1", &first.id).await.unwrap_err();
    assert!(matches!(err, DebtManagementError::DebtNotFound { .. }));
    // A debt can only be removed through its own order
    let other = db.list_debts_for_order("ORD2").await.unwrap();
    assert!(db.remove_debt_in_order("ORD1", &other[0].id).await.is_err());

    assert_eq!(db.remove_all_debts_for_order("ORD1").await.unwrap(), 1);
    assert_eq!(db.remove_all_debts_for_order("ORD1").await.unwrap(), 0);
    assert!(db.list_debts_for_order("ORD1").await.unwrap().is_empty());
    assert_eq!(db.list_debts_for_order("ORD2").await.unwrap().len(), 1);
}

#[tokio::test]
async fn order_records() {
    let db = prepare_test_env().await;
    assert!(db.fetch_order_by_original_id("ABC123").await.unwrap().is_none());
    let record = NewOrderRecord {
        original_id: "ABC123".to_string(),
        created_at: Utc::now(),
        receiver: "C-lunch".to_string(),
        venue_name: "Falafel Stand".to_string(),
        venue_id: "venue-1".to_string(),
        venue_link: "https://wolt.com/en/isr/tel-aviv/restaurant/falafel".to_string(),
        venue_city: "Tel Aviv".to_string(),
        host: "Bob".to_string(),
        host_id: "u-bob".to_string(),
        status: RecordStatus::Done,
        participants: vec![
            OrderParticipant { name: "Alice".to_string(), user_id: "u-alice".to_string(), amount: Money::from_minor(2500) },
            OrderParticipant { name: "Bob".to_string(), user_id: "u-bob".to_string(), amount: Money::from_minor(500) },
        ],
        delivery_rate: 10,
    };
    let saved = db.save_order(record.clone()).await.unwrap();
    assert_eq!(saved.status, RecordStatus::Done);
    assert_eq!(saved.participants.0, record.participants);

    let fetched = db.fetch_order_by_original_id("ABC123").await.unwrap().unwrap();
    assert_eq!(fetched.id, saved.id);
    assert_eq!(fetched.venue_city, "Tel Aviv");
    assert_eq!(fetched.delivery_rate, 10);
}
