//! Integration tests for the session-gated front door and notifications.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::mpsc;
use waitlist::engine::Engine;
use waitlist::error::{Error, Result};
use waitlist::event::EventKind;
use waitlist::model::*;
use waitlist::notify::{MessageReceipt, MessageSender, MessageTemplates};
use waitlist::service::{Waitlist, WaitlistOptions};
use waitlist::session::StaticSessionProvider;

const EMAIL: &str = "host@example.com";
const PASSWORD: &str = "hunter2";

/// Forwards every message to a channel.
struct ChannelSender(mpsc::UnboundedSender<(String, String)>);

#[async_trait]
impl MessageSender for ChannelSender {
    async fn send_message(&self, to: &str, body: &str) -> Result<MessageReceipt> {
        let _ = self.0.send((to.to_string(), body.to_string()));
        Ok(MessageReceipt {
            accepted: true,
            provider_id: "SM-test".to_string(),
        })
    }
}

/// Always fails.
struct DownSender;

#[async_trait]
impl MessageSender for DownSender {
    async fn send_message(&self, _to: &str, _body: &str) -> Result<MessageReceipt> {
        Err(Error::Messaging("provider unavailable".to_string()))
    }
}

fn waitlist_with(messenger: Arc<dyn MessageSender>) -> Waitlist {
    let sessions = Arc::new(StaticSessionProvider::new(
        EMAIL,
        SecretString::from(PASSWORD),
    ));
    let options = WaitlistOptions {
        templates: MessageTemplates {
            table_ready: "{name}: table {table}".to_string(),
            call: "{name}: party of {party_size}".to_string(),
        },
        message_timeout: Duration::from_secs(2),
        ..WaitlistOptions::default()
    };
    Waitlist::new(Engine::in_memory(), sessions, messenger, options)
}

async fn logged_in(messenger: Arc<dyn MessageSender>) -> Waitlist {
    let waitlist = waitlist_with(messenger);
    waitlist
        .login(EMAIL, &SecretString::from(PASSWORD))
        .await
        .unwrap();
    waitlist
}

fn amina() -> NewCustomer {
    NewCustomer::new("Amina", 3, "+971501234567")
}

#[tokio::test]
async fn operations_require_a_session() {
    let waitlist = waitlist_with(Arc::new(DownSender));

    assert!(matches!(
        waitlist.register(amina()).await,
        Err(Error::Unauthenticated)
    ));
    assert!(matches!(waitlist.board().await, Err(Error::Unauthenticated)));

    waitlist
        .login(EMAIL, &SecretString::from(PASSWORD))
        .await
        .unwrap();
    let record = waitlist.register(amina()).await.unwrap();

    waitlist.logout().await.unwrap();
    assert!(matches!(
        waitlist.cancel(record.id).await,
        Err(Error::Unauthenticated)
    ));
}

#[tokio::test]
async fn wrong_password_leaves_no_session() {
    let waitlist = waitlist_with(Arc::new(DownSender));

    let err = waitlist
        .login(EMAIL, &SecretString::from("nope"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Session(_)));
    assert!(waitlist.current_session().await.unwrap().is_none());
}

#[tokio::test]
async fn seating_texts_the_party() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let waitlist = logged_in(Arc::new(ChannelSender(tx))).await;
    let record = waitlist.register(amina()).await.unwrap();

    let seated = waitlist.seat(record.id, 5).await.unwrap();
    seated.notice.expect("notice dispatched").await.unwrap();

    let (to, body) = rx.recv().await.unwrap();
    assert_eq!(to, "+971501234567");
    assert_eq!(body, "Amina: table 5");

    let events = waitlist.events_since(0).await.unwrap();
    assert!(matches!(
        events.last().unwrap().kind,
        EventKind::NoticeSent { ref provider_id, .. } if provider_id == "SM-test"
    ));
}

#[tokio::test]
async fn failed_notice_does_not_undo_seating() {
    let waitlist = logged_in(Arc::new(DownSender)).await;
    let record = waitlist.register(amina()).await.unwrap();

    let seated = waitlist.seat(record.id, 2).await.unwrap();
    seated.notice.expect("notice dispatched").await.unwrap();

    let current = waitlist.get(record.id).await.unwrap().unwrap();
    assert_eq!(current.state(), State::Seated);

    let events = waitlist.events_since(0).await.unwrap();
    assert!(matches!(
        events.last().unwrap().kind,
        EventKind::NoticeFailed { .. }
    ));
}

#[tokio::test]
async fn seat_notice_can_be_disabled() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let sessions = Arc::new(StaticSessionProvider::new(
        EMAIL,
        SecretString::from(PASSWORD),
    ));
    let waitlist = Waitlist::new(
        Engine::in_memory(),
        sessions,
        Arc::new(ChannelSender(tx)),
        WaitlistOptions {
            notify_on_seat: false,
            ..WaitlistOptions::default()
        },
    );
    waitlist
        .login(EMAIL, &SecretString::from(PASSWORD))
        .await
        .unwrap();

    let record = waitlist.register(amina()).await.unwrap();
    let seated = waitlist.seat(record.id, 1).await.unwrap();

    assert!(seated.notice.is_none());
    drop(waitlist);
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn call_reaches_waiting_party_without_moving_it() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let waitlist = logged_in(Arc::new(ChannelSender(tx))).await;
    let record = waitlist.register(amina()).await.unwrap();

    let receipt = waitlist.call(record.id).await.unwrap();

    assert!(receipt.accepted);
    assert_eq!(rx.recv().await.unwrap().1, "Amina: party of 3");
    let board = waitlist.board().await.unwrap();
    assert_eq!(board.next_to_seat().unwrap().record.id, record.id);
}

#[tokio::test]
async fn call_refuses_closed_records() {
    let waitlist = logged_in(Arc::new(DownSender)).await;
    let record = waitlist.register(amina()).await.unwrap();
    waitlist.cancel(record.id).await.unwrap();

    match waitlist.call(record.id).await {
        Err(Error::StateConflict { actual, .. }) => assert_eq!(actual, Some(State::Canceled)),
        other => panic!("expected StateConflict, got {other:?}"),
    }
    assert!(waitlist.call(CustomerId::new()).await.unwrap_err().is_state_conflict());
}

#[tokio::test]
async fn failed_call_is_reported_and_recorded() {
    let waitlist = logged_in(Arc::new(DownSender)).await;
    let record = waitlist.register(amina()).await.unwrap();

    let err = waitlist.call(record.id).await.unwrap_err();

    assert!(err.is_external());
    let events = waitlist.events_since(0).await.unwrap();
    assert!(matches!(
        events.last().unwrap().kind,
        EventKind::NoticeFailed { .. }
    ));
    assert_eq!(waitlist.stats().await.unwrap().waiting, 1);
}

#[tokio::test]
async fn export_log_covers_every_state() {
    let waitlist = logged_in(Arc::new(DownSender)).await;
    let a = waitlist.register(amina()).await.unwrap();
    let b = waitlist
        .register(NewCustomer::new("Sam", 2, "+971509999999"))
        .await
        .unwrap();
    waitlist.cancel(b.id).await.unwrap();
    let seated = waitlist.seat(a.id, 4).await.unwrap();
    if let Some(notice) = seated.notice {
        notice.await.unwrap();
    }

    let log = waitlist.export_log().await.unwrap();
    assert_eq!(log.len(), 2);
}
