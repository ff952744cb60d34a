//! Command dispatcher - Routes input lines to command handlers

use std::sync::Arc;

use super::commands::default_commands;
use super::parser::{LineParser, ParsedLine};
use crate::application::errors::ChatError;
use crate::application::services::SessionRegistry;
use crate::domain::entities::{CommandTable, Session};
use crate::domain::traits::{CommandContext, CommandOutcome};
use crate::infrastructure::audit::AuditLog;

/// Line written when the command token is not in the table
pub const UNKNOWN_COMMAND: &str = "No such command!";

/// What happened to one input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Blank line, nothing ran
    Empty,
    /// Command token not in the table
    Unknown(String),
    /// Command ran to completion
    Completed(String),
    /// Command ran and failed; the error was shown to the issuer
    Failed { command: String, error: ChatError },
    /// Command asked for the session to end
    Disconnect,
    /// Session is no longer connected; the line was dropped
    Closed,
}

/// Parses input lines, runs the matching command and isolates failures
pub struct CommandDispatcher {
    parser: LineParser,
    commands: CommandTable,
    registry: Arc<SessionRegistry>,
    audit: Arc<AuditLog>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<SessionRegistry>, audit: Arc<AuditLog>) -> Self {
        Self::with_commands(default_commands(), registry, audit)
    }

    pub fn with_commands(
        commands: CommandTable,
        registry: Arc<SessionRegistry>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            parser: LineParser::new(),
            commands,
            registry,
            audit,
        }
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    /// Process one raw line from `session`.
    ///
    /// Errors never escape: they are written to the issuing session as
    /// `Error: ...`. The prompt is re-emitted afterwards unless the session
    /// ended.
    pub async fn dispatch(&self, session: &Arc<Session>, raw: &str) -> DispatchOutcome {
        if !session.is_connected() {
            tracing::debug!("[{}] Dropping line for closed session", session.username());
            return DispatchOutcome::Closed;
        }

        let (name, args) = match self.parser.parse(raw) {
            ParsedLine::Empty => {
                session.prompt().await;
                return DispatchOutcome::Empty;
            }
            ParsedLine::Command { name, args } => (name, args),
        };

        tracing::debug!("[{}] {}", session.username(), raw.trim());
        self.audit.record(session.username(), raw.trim()).await;

        let outcome = self.run(session, name, &args).await;

        if outcome != DispatchOutcome::Disconnect && !session.is_closed() {
            session.prompt().await;
        }
        outcome
    }

    async fn run(&self, session: &Arc<Session>, name: String, args: &[String]) -> DispatchOutcome {
        let Some(command) = self.commands.get(&name) else {
            session.notify(UNKNOWN_COMMAND).await;
            return DispatchOutcome::Unknown(name);
        };

        let result = match command.arity.check(&command.name, args) {
            Ok(()) => {
                let ctx = CommandContext {
                    session,
                    registry: &self.registry,
                    commands: &self.commands,
                    args,
                };
                command.handler.execute(ctx).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(CommandOutcome::Continue) => DispatchOutcome::Completed(name),
            Ok(CommandOutcome::Disconnect) => DispatchOutcome::Disconnect,
            Err(error) => {
                tracing::warn!("[{}] {} failed: {}", session.username(), name, error);
                session.notify(&format!("Error: {}", error)).await;
                DispatchOutcome::Failed { command: name, error }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::memory::MemorySink;

    struct Fixture {
        registry: Arc<SessionRegistry>,
        dispatcher: CommandDispatcher,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = Arc::new(SessionRegistry::new());
            let dispatcher = CommandDispatcher::new(registry.clone(), Arc::new(AuditLog::disabled()));
            Self { registry, dispatcher }
        }

        async fn connect(&self, name: &str) -> (Arc<Session>, Arc<MemorySink>) {
            let sink = Arc::new(MemorySink::new());
            let session = Arc::new(Session::new(name, sink.clone()));
            self.registry.join(session.clone()).await.unwrap();
            session.mark_connected();
            (session, sink)
        }
    }

    #[tokio::test]
    async fn test_empty_line_only_prompts() {
        let fx = Fixture::new();
        let (alice, sink) = fx.connect("alice").await;

        let outcome = fx.dispatcher.dispatch(&alice, "   ").await;

        assert_eq!(outcome, DispatchOutcome::Empty);
        assert_eq!(sink.output(), "$ ");
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let fx = Fixture::new();
        let (alice, sink) = fx.connect("alice").await;

        let outcome = fx.dispatcher.dispatch(&alice, "foobar").await;

        assert_eq!(outcome, DispatchOutcome::Unknown("foobar".to_string()));
        assert_eq!(sink.output(), "No such command!\r\n$ ");
        assert_eq!(fx.registry.usernames().await, vec!["alice"]);
    }

    #[tokio::test]
    async fn test_lookup_is_case_sensitive() {
        let fx = Fixture::new();
        let (alice, sink) = fx.connect("alice").await;

        let outcome = fx.dispatcher.dispatch(&alice, "HELP").await;

        assert_eq!(outcome, DispatchOutcome::Unknown("HELP".to_string()));
        assert_eq!(sink.lines(), vec!["No such command!"]);
    }

    #[tokio::test]
    async fn test_echo_goes_to_issuer_only() {
        let fx = Fixture::new();
        let (x, x_sink) = fx.connect("x").await;
        let (_y, y_sink) = fx.connect("y").await;

        let outcome = fx.dispatcher.dispatch(&x, "echo a b c").await;

        assert_eq!(outcome, DispatchOutcome::Completed("echo".to_string()));
        assert_eq!(x_sink.output(), "a b c\r\n$ ");
        assert_eq!(y_sink.output(), "");
    }

    #[tokio::test]
    async fn test_help_lists_commands() {
        let fx = Fixture::new();
        let (alice, sink) = fx.connect("alice").await;

        fx.dispatcher.dispatch(&alice, "help").await;

        assert_eq!(sink.lines(), vec!["Commands: clear echo help quit send"]);
    }

    #[tokio::test]
    async fn test_send_to_registered_user() {
        let fx = Fixture::new();
        let (alice, alice_sink) = fx.connect("alice").await;
        let (_bob, bob_sink) = fx.connect("bob").await;

        let outcome = fx.dispatcher.dispatch(&alice, "send bob hello there").await;

        assert_eq!(outcome, DispatchOutcome::Completed("send".to_string()));
        assert_eq!(bob_sink.output(), "Message from Client[alice]: hello there\r\n");
        assert_eq!(alice_sink.output(), "$ ");
    }

    #[tokio::test]
    async fn test_send_to_missing_user() {
        let fx = Fixture::new();
        let (alice, alice_sink) = fx.connect("alice").await;

        let outcome = fx.dispatcher.dispatch(&alice, "send bob hello").await;

        assert_eq!(
            outcome,
            DispatchOutcome::Failed {
                command: "send".to_string(),
                error: ChatError::UserNotFound("bob".to_string()),
            }
        );
        assert_eq!(alice_sink.output(), "Error: No such user: bob\r\n$ ");
    }

    #[tokio::test]
    async fn test_malformed_arguments_keep_session_usable() {
        let fx = Fixture::new();
        let (alice, sink) = fx.connect("alice").await;

        let first = fx.dispatcher.dispatch(&alice, "send").await;
        let second = fx.dispatcher.dispatch(&alice, "quit now").await;
        let third = fx.dispatcher.dispatch(&alice, "echo still here").await;

        assert!(matches!(first, DispatchOutcome::Failed { error: ChatError::MalformedCommand { .. }, .. }));
        assert!(matches!(second, DispatchOutcome::Failed { error: ChatError::MalformedCommand { .. }, .. }));
        assert_eq!(third, DispatchOutcome::Completed("echo".to_string()));
        let lines = sink.lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Error: send:"));
        assert!(lines[1].starts_with("Error: quit:"));
        assert_eq!(lines[2], "still here");
        assert!(alice.is_connected());
    }

    #[tokio::test]
    async fn test_clear_requests_screen_reset() {
        let fx = Fixture::new();
        let (alice, sink) = fx.connect("alice").await;

        let outcome = fx.dispatcher.dispatch(&alice, "clear").await;

        assert_eq!(outcome, DispatchOutcome::Completed("clear".to_string()));
        assert_eq!(sink.clear_count(), 1);
        assert_eq!(sink.output(), "$ ");
    }

    #[tokio::test]
    async fn test_quit_closes_without_prompt() {
        let fx = Fixture::new();
        let (alice, sink) = fx.connect("alice").await;

        let outcome = fx.dispatcher.dispatch(&alice, "quit").await;

        assert_eq!(outcome, DispatchOutcome::Disconnect);
        assert_eq!(sink.output(), "Goodbye!\r\n");
        assert!(sink.is_closed());
    }

    #[tokio::test]
    async fn test_lines_for_disconnected_session_are_dropped() {
        let fx = Fixture::new();
        let (alice, sink) = fx.connect("alice").await;
        alice.mark_disconnected();

        let outcome = fx.dispatcher.dispatch(&alice, "echo hi").await;

        assert_eq!(outcome, DispatchOutcome::Closed);
        assert_eq!(sink.output(), "");
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_break_dispatch() {
        let fx = Fixture::new();
        let session = Arc::new(Session::new("ghost", Arc::new(MemorySink::failing())));
        fx.registry.join(session.clone()).await.unwrap();
        session.mark_connected();

        let outcome = fx.dispatcher.dispatch(&session, "echo boo").await;

        assert_eq!(outcome, DispatchOutcome::Completed("echo".to_string()));
    }
}
