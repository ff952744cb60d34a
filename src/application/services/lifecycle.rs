//! Lifecycle coordinator - Join/leave side effects around a connection

use std::sync::Arc;

use super::registry::SessionRegistry;
use crate::application::errors::ChatError;
use crate::application::messaging::{help_listing, CommandDispatcher, DispatchOutcome};
use crate::domain::entities::{Session, SessionState};
use crate::domain::traits::OutputSink;
use crate::infrastructure::audit::AuditLog;

/// Banner written to every new session
pub const DEFAULT_WELCOME: &str = "Welcome to the SSH Chatroom!";

/// Notice broadcast when `username` leaves
pub fn disconnect_notice(username: &str) -> String {
    format!("Client[{}] disconnected!", username)
}

/// Drives a session from connect to disconnect.
///
/// Transports call [`connect`](Self::connect) once, then
/// [`handle_line`](Self::handle_line) per input line, and finally
/// [`disconnect`](Self::disconnect) when the connection goes away. The
/// disconnect side effects run at most once per session no matter how many
/// paths trigger them.
pub struct LifecycleCoordinator {
    registry: Arc<SessionRegistry>,
    dispatcher: CommandDispatcher,
    audit: Arc<AuditLog>,
    welcome: String,
}

impl LifecycleCoordinator {
    pub fn new(registry: Arc<SessionRegistry>, audit: Arc<AuditLog>) -> Self {
        let dispatcher = CommandDispatcher::new(registry.clone(), audit.clone());
        Self {
            registry,
            dispatcher,
            audit,
            welcome: DEFAULT_WELCOME.to_string(),
        }
    }

    pub fn with_welcome(mut self, welcome: impl Into<String>) -> Self {
        self.welcome = welcome.into();
        self
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Register a new connection.
    ///
    /// A username that is already connected is rejected: the newcomer gets
    /// an error line and its connection is closed, the existing session is
    /// left alone.
    pub async fn connect(
        &self,
        username: impl Into<String>,
        sink: Arc<dyn OutputSink>,
    ) -> Result<Arc<Session>, ChatError> {
        let session =
            Session::new(username, sink).with_write_timeout(self.registry.delivery_timeout());
        self.connect_session(Arc::new(session)).await
    }

    /// Register an already built session, see [`connect`](Self::connect).
    ///
    /// Fails if the session was torn down before it finished connecting.
    pub async fn connect_session(&self, session: Arc<Session>) -> Result<Arc<Session>, ChatError> {
        if let Err(e) = self.registry.join(session.clone()).await {
            tracing::warn!("Rejected {}: {}", session, e);
            session.mark_disconnected();
            session.notify(&format!("Error: {}", e)).await;
            session.disconnect().await;
            self.audit.record(session.username(), "rejected").await;
            return Err(e);
        }

        if !session.mark_connected() {
            tracing::warn!("{} went away while connecting", session);
            self.registry.leave_session(&session).await;
            session.disconnect().await;
            return Err(ChatError::SinkUnavailable(format!(
                "{} disconnected while connecting",
                session
            )));
        }

        session.notify(&self.welcome).await;
        session.notify(&help_listing(self.dispatcher.commands())).await;
        session.prompt().await;

        tracing::info!("{} connected", session);
        self.audit.record(session.username(), "connected").await;
        Ok(session)
    }

    /// Dispatch one input line, tearing the session down after `quit`
    pub async fn handle_line(&self, session: &Arc<Session>, line: &str) -> DispatchOutcome {
        let outcome = self.dispatcher.dispatch(session, line).await;
        if outcome == DispatchOutcome::Disconnect {
            self.disconnect(session).await;
        }
        outcome
    }

    /// Tear a session down: leave the registry, notify everyone still
    /// connected, close the transport and write the audit record.
    ///
    /// The transport is closed last so a connection that never finishes
    /// closing cannot hold the username or the notice back.
    ///
    /// Returns true only for the call that actually performed the teardown.
    pub async fn disconnect(&self, session: &Arc<Session>) -> bool {
        match session.mark_disconnected() {
            Some(SessionState::Connected) => {}
            Some(SessionState::Connecting) => {
                self.registry.leave_session(session).await;
                session.disconnect().await;
                return false;
            }
            _ => return false,
        }

        let username = session.username();
        self.registry.leave_session(session).await;

        let report = self
            .registry
            .broadcast_except(Some(username), &disconnect_notice(username))
            .await;
        tracing::info!(
            "{} disconnected ({} notified, {} unreachable)",
            session,
            report.delivered,
            report.failed.len()
        );

        session.disconnect().await;
        self.audit.record(username, "disconnected").await;
        true
    }
}
