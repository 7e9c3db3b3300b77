//! Front door for a presentation layer.
//!
//! `Waitlist` gates every queue operation on an active operator session
//! and wires the engine to the messaging capability. The engine runs as a
//! single logical actor behind an async mutex: operations never
//! interleave. Notifications run outside the lock and never block or
//! reverse a transition.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info_span};

use crate::board::{Board, QueueStats};
use crate::config::Config;
use crate::engine::{Engine, MobilePolicy};
use crate::error::{Error, Result};
use crate::event::{Event, EventKind};
use crate::export::ActivityLog;
use crate::model::*;
use crate::notify::{
    self, LogSender, MessageReceipt, MessageSender, MessageTemplates, NoticeKind, TwilioConfig,
    TwilioSender,
};
use crate::session::{
    Session, SessionProvider, StaticSessionProvider, SupabaseSessionProvider,
};

#[derive(Debug, Clone)]
pub struct WaitlistOptions {
    /// Text the party when they are seated.
    pub notify_on_seat: bool,
    pub templates: MessageTemplates,
    /// Deadline for one outbound message.
    pub message_timeout: Duration,
}

impl Default for WaitlistOptions {
    fn default() -> Self {
        Self {
            notify_on_seat: true,
            templates: MessageTemplates::default(),
            message_timeout: Duration::from_secs(10),
        }
    }
}

/// Result of seating a party.
#[derive(Debug)]
pub struct Seated {
    pub record: CustomerRecord,
    /// The table-ready notice, if one was dispatched. Dropping the handle
    /// does not cancel the send.
    pub notice: Option<JoinHandle<()>>,
}

pub struct Waitlist {
    engine: Arc<Mutex<Engine>>,
    sessions: Arc<dyn SessionProvider>,
    messenger: Arc<dyn MessageSender>,
    options: WaitlistOptions,
}

impl Waitlist {
    pub fn new(
        engine: Engine,
        sessions: Arc<dyn SessionProvider>,
        messenger: Arc<dyn MessageSender>,
        options: WaitlistOptions,
    ) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            sessions,
            messenger,
            options,
        }
    }

    /// Wire up store, messaging and sessions from configuration.
    ///
    /// Supabase takes precedence over static operator credentials; one of
    /// the two is required. Without Twilio settings messages are only
    /// logged.
    pub fn from_config(config: &Config) -> Result<Self> {
        let engine = match &config.db_path {
            Some(path) => Engine::open(path)?,
            None => Engine::in_memory(),
        }
        .with_policy(MobilePolicy::new(config.mobile_prefix.clone()));

        let sessions: Arc<dyn SessionProvider> = match (&config.supabase, &config.operator) {
            (Some(supabase), _) => Arc::new(SupabaseSessionProvider::new(
                supabase.url.clone(),
                supabase.anon_key.clone(),
                config.message_timeout,
            )?),
            (None, Some(operator)) => Arc::new(StaticSessionProvider::new(
                operator.email.clone(),
                operator.password.clone(),
            )),
            (None, None) => {
                return Err(Error::Config(
                    "no session provider: set SUPABASE_URL/SUPABASE_ANON_KEY or \
                     WAITLIST_OPERATOR_EMAIL/WAITLIST_OPERATOR_PASSWORD"
                        .to_string(),
                ));
            }
        };

        let messenger: Arc<dyn MessageSender> = match &config.twilio {
            Some(twilio) => {
                let mut twilio_config = TwilioConfig::new(
                    twilio.account_sid.clone(),
                    twilio.auth_token.clone(),
                    twilio.from_number.clone(),
                );
                twilio_config.timeout = config.message_timeout;
                Arc::new(TwilioSender::new(twilio_config)?)
            }
            None => Arc::new(LogSender),
        };

        let templates = match &config.templates_path {
            Some(path) => MessageTemplates::load(path)?,
            None => MessageTemplates::default(),
        };

        Ok(Self::new(
            engine,
            sessions,
            messenger,
            WaitlistOptions {
                notify_on_seat: config.notify_on_seat,
                templates,
                message_timeout: config.message_timeout,
            },
        ))
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    pub async fn login(&self, email: &str, password: &SecretString) -> Result<Session> {
        self.sessions.login(email, password).await
    }

    pub async fn logout(&self) -> Result<()> {
        self.sessions.logout().await
    }

    pub async fn current_session(&self) -> Result<Option<Session>> {
        self.sessions.check_session().await
    }

    async fn authorize(&self) -> Result<Session> {
        self.sessions
            .check_session()
            .await?
            .ok_or(Error::Unauthenticated)
    }

    // -----------------------------------------------------------------------
    // Queue operations
    // -----------------------------------------------------------------------

    pub async fn register(&self, new: NewCustomer) -> Result<CustomerRecord> {
        self.authorize().await?;
        self.engine.lock().await.register(new)
    }

    pub async fn cancel(&self, id: CustomerId) -> Result<CustomerRecord> {
        self.authorize().await?;
        self.engine.lock().await.cancel(id)
    }

    /// Seat a party and, if enabled, text them in the background.
    pub async fn seat(&self, id: CustomerId, table_number: u32) -> Result<Seated> {
        self.authorize().await?;
        let record = self.engine.lock().await.seat(id, table_number)?;

        let notice = self
            .options
            .notify_on_seat
            .then(|| self.spawn_table_ready(&record));

        Ok(Seated { record, notice })
    }

    pub async fn finish(&self, id: CustomerId) -> Result<CustomerRecord> {
        self.authorize().await?;
        self.engine.lock().await.finish(id)
    }

    /// Text a party that is waiting or seated. Queue state is unaffected
    /// whether or not the send succeeds.
    pub async fn call(&self, id: CustomerId) -> Result<MessageReceipt> {
        self.authorize().await?;
        let record = self.engine.lock().await.get(id)?;
        let record = match record {
            Some(r) if !r.state().is_terminal() => r,
            other => {
                return Err(Error::StateConflict {
                    id,
                    expected: State::Waiting,
                    actual: other.map(|r| r.state()),
                });
            }
        };

        let body = self.options.templates.render_call(&record);
        let result = notify::deliver(
            &self.messenger,
            NoticeKind::Call,
            &record.mobile_number,
            &body,
            self.options.message_timeout,
        )
        .await;

        record_notice(&self.engine, id, &result).await;
        result
    }

    // -----------------------------------------------------------------------
    // Read projections
    // -----------------------------------------------------------------------

    pub async fn get(&self, id: CustomerId) -> Result<Option<CustomerRecord>> {
        self.authorize().await?;
        self.engine.lock().await.get(id)
    }

    pub async fn board(&self) -> Result<Board> {
        self.authorize().await?;
        self.engine.lock().await.board()
    }

    pub async fn stats(&self) -> Result<QueueStats> {
        self.authorize().await?;
        self.engine.lock().await.stats()
    }

    pub async fn export_log(&self) -> Result<ActivityLog> {
        self.authorize().await?;
        self.engine.lock().await.export_log()
    }

    pub async fn events_since(&self, since_seq: u64) -> Result<Vec<Event>> {
        self.authorize().await?;
        self.engine.lock().await.events_since(since_seq)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn spawn_table_ready(&self, record: &CustomerRecord) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        let messenger = Arc::clone(&self.messenger);
        let timeout = self.options.message_timeout;
        let body = self.options.templates.render_table_ready(record);
        let to = record.mobile_number.clone();
        let id = record.id;

        let span = info_span!("waitlist.notice", "customer.id" = %id, kind = "table_ready");
        tokio::spawn(
            async move {
                let result =
                    notify::deliver(&messenger, NoticeKind::TableReady, &to, &body, timeout).await;
                record_notice(&engine, id, &result).await;
            }
            .instrument(span),
        )
    }
}

/// Append the outcome of a send to the event log. Failures here are
/// logged only.
async fn record_notice(
    engine: &Arc<Mutex<Engine>>,
    id: CustomerId,
    result: &Result<MessageReceipt>,
) {
    let kind = match result {
        Ok(receipt) => EventKind::NoticeSent {
            id,
            provider_id: receipt.provider_id.clone(),
        },
        Err(e) => EventKind::NoticeFailed {
            id,
            error: e.to_string(),
        },
    };
    if let Err(e) = engine.lock().await.record_event(kind) {
        error!(%id, error = %e, "cannot record notice outcome");
    }
}
