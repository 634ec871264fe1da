// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-role event loop.
//!
//! Each bot gets one [`RoleLoop`] that owns its session table and processes
//! that bot's inbound events one at a time. Different roles run concurrently
//! and only meet in the store, where the guarded transitions arbitrate.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use intercab_core::error::{ErrorKind, IntercabError};
use intercab_core::types::{InboundMessage, MessageContent, Role};
use intercab_core::ChannelAdapter;

use crate::context::DispatchContext;
use crate::handlers::{self, Event, Turn};
use crate::render;
use crate::session::SessionStore;
use crate::shutdown;

/// Pause after a transient receive failure before polling again.
const RECEIVE_BACKOFF: Duration = Duration::from_millis(500);

/// Event loop for one role's bot.
pub struct RoleLoop {
    role: Role,
    channel: Arc<dyn ChannelAdapter + Send + Sync>,
    ctx: DispatchContext,
    sessions: SessionStore,
}

impl RoleLoop {
    pub fn new(role: Role, channel: Arc<dyn ChannelAdapter + Send + Sync>, ctx: DispatchContext) -> Self {
        info!(%role, "role loop initialized");
        Self {
            role,
            channel,
            ctx,
            sessions: SessionStore::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Runs until the cancellation token fires or the channel closes.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), IntercabError> {
        info!(role = %self.role, "role loop running");

        loop {
            tokio::select! {
                msg = self.channel.receive() => {
                    match msg {
                        Ok(inbound) => {
                            if let Err(e) = self.handle_inbound(inbound).await {
                                error!(role = %self.role, error = %e, "failed to handle inbound message");
                            }
                        }
                        Err(e) => {
                            // A closed channel means the adapter is gone for good.
                            if e.to_string().contains("closed") {
                                info!(role = %self.role, "channel closed, stopping role loop");
                                break;
                            }
                            error!(role = %self.role, error = %e, "channel receive error");
                            tokio::time::sleep(RECEIVE_BACKOFF).await;
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!(role = %self.role, "shutdown signal received, stopping role loop");
                    break;
                }
            }
        }

        shutdown::report_abandoned_sessions(self.role, &self.sessions);
        info!(role = %self.role, "role loop stopped");
        Ok(())
    }

    /// Processes one inbound event and renders any failure to the user.
    ///
    /// Contention, missing prerequisites and delivery failures are handled
    /// here and yield `Ok`. Persistence failures are reported to the user with
    /// a generic message and returned for logging.
    pub async fn handle_inbound(&mut self, inbound: InboundMessage) -> Result<(), IntercabError> {
        debug!(
            role = %self.role,
            platform_id = inbound.sender.platform_id,
            message_id = inbound.id.as_str(),
            "handling inbound message"
        );

        let ack_id = match &inbound.content {
            MessageContent::Button { ack_id, .. } => ack_id.clone(),
            _ => None,
        };

        let Some(event) = Event::from_content(inbound.content) else {
            self.acknowledge(ack_id.as_deref(), None).await;
            return Ok(());
        };
        let stale = event.stale_message().map(str::to_string);

        let mut turn = Turn {
            ctx: &self.ctx,
            channel: self.channel.as_ref(),
            sessions: &mut self.sessions,
            role: self.role,
            chat_id: inbound.chat_id,
            sender: &inbound.sender,
            message_id: &inbound.id,
        };

        let (toast, result) = match handlers::handle(&mut turn, event).await {
            Ok(()) => (None, Ok(())),
            Err(e) => recover(&mut turn, e, stale.as_deref()).await,
        };

        self.acknowledge(ack_id.as_deref(), toast.as_deref()).await;
        result
    }

    async fn acknowledge(&self, ack_id: Option<&str>, text: Option<&str>) {
        if let Some(id) = ack_id
            && let Err(e) = self.channel.acknowledge(id, text).await
        {
            debug!(role = %self.role, error = %e, "failed to acknowledge button press");
        }
    }
}

/// Renders a handler error according to its kind. Returns the toast for the
/// button acknowledgement and the error to propagate, if any.
async fn recover(
    turn: &mut Turn<'_>,
    err: IntercabError,
    stale: Option<&str>,
) -> (Option<String>, Result<(), IntercabError>) {
    match err.kind() {
        ErrorKind::Contention => {
            info!(role = %turn.role, error = %err, "lost a race");
            let text = match &err {
                IntercabError::Contention { order_id, .. } if turn.role == Role::Operator => {
                    render::already_handled(*order_id)
                }
                IntercabError::Contention { order_id, .. } => render::no_longer_available(*order_id),
                other => other.to_string(),
            };
            turn.delete(stale).await;
            best_effort(turn.say(text.clone()).await);
            (Some(text), Ok(()))
        }
        ErrorKind::MissingPrerequisite => {
            info!(role = %turn.role, error = %err, "conversation out of step, restarting");
            if let Some(session) = turn.sessions.get_mut(turn.role, turn.sender.platform_id) {
                session.reset();
            }
            turn.delete(stale).await;
            best_effort(turn.reply(render::restart_prompt()).await);
            (None, Ok(()))
        }
        ErrorKind::Delivery => {
            warn!(role = %turn.role, error = %err, "delivery failed");
            (None, Ok(()))
        }
        ErrorKind::Persistence => {
            best_effort(turn.say(render::GENERIC_FAILURE).await);
            (Some(render::GENERIC_FAILURE.to_string()), Err(err))
        }
    }
}

fn best_effort(result: Result<(), IntercabError>) {
    if let Err(e) = result {
        debug!(error = %e, "failed to send error notice");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intercab_core::action::Action;
    use intercab_core::types::{OrderStatus, Sender};
    use intercab_test_utils::MockChannel;

    use crate::testing::Fixture;

    fn button(pid: i64, payload: &str) -> InboundMessage {
        InboundMessage {
            id: "900".into(),
            chat_id: pid,
            sender: Sender {
                platform_id: pid,
                username: None,
                full_name: format!("user {pid}"),
            },
            content: MessageContent::Button {
                payload: payload.into(),
                message_id: Some("77".into()),
                ack_id: Some(format!("cb{pid}")),
            },
            timestamp: "2026-01-01T00:00:00Z".into(),
        }
    }

    fn driver_loop(fx: &Fixture) -> RoleLoop {
        RoleLoop::new(Role::Driver, fx.driver_channel.clone(), fx.ctx.clone())
    }

    #[tokio::test]
    async fn lost_claim_race_is_reported_not_raised() {
        let fx = Fixture::new().await;
        let first = fx.active_driver(1).await;
        fx.active_driver(2).await;
        let order = fx.active_order().await;
        crate::dispatcher::claim(&fx.ctx, order.id, &first).await.unwrap();
        fx.driver_channel.clear_sent().await;

        let mut role_loop = driver_loop(&fx);
        role_loop
            .handle_inbound(button(2, &Action::Claim(order.id).to_string()))
            .await
            .unwrap();

        let sent = fx.driver_channel.sent_to(2).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, render::no_longer_available(order.id));
        assert_eq!(fx.driver_channel.deleted().await, vec![(2, "77".to_string())]);
        let acks = fx.driver_channel.acks().await;
        assert_eq!(acks[0].1.as_deref(), Some(sent[0].text.as_str()));

        let stored = fx.ctx.storage.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::WaitConfirm);
        assert_eq!(stored.driver_id, Some(first.id));
    }

    #[tokio::test]
    async fn operator_sees_already_handled() {
        let fx = Fixture::new().await;
        fx.operator(501).await;
        fx.operator(502).await;
        let order = fx.pending_order().await;
        crate::approval::approve_order(&fx.ctx, order.id).await.unwrap();
        fx.operator_channel.clear_sent().await;

        let mut role_loop = RoleLoop::new(Role::Operator, fx.operator_channel.clone(), fx.ctx.clone());
        role_loop
            .handle_inbound(button(502, &Action::ApproveOrder(order.id).to_string()))
            .await
            .unwrap();
        let sent = fx.operator_channel.sent_to(502).await;
        assert_eq!(sent[0].text, render::already_handled(order.id));
    }

    #[tokio::test]
    async fn late_rider_cancel_is_reported_not_raised() {
        let fx = Fixture::new().await;
        let driver = fx.active_driver(1).await;
        let order = fx.taken_order(&driver).await;
        crate::trips::advance(
            &fx.ctx,
            order.id,
            intercab_core::lifecycle::OrderTransition::DepartToPickup { driver_id: driver.id },
        )
        .await
        .unwrap();
        fx.rider_channel.clear_sent().await;

        let mut role_loop = RoleLoop::new(Role::Rider, fx.rider_channel.clone(), fx.ctx.clone());
        let cancel = Action::CancelOrder(order.id).to_string();
        role_loop
            .handle_inbound(button(fx.rider.platform_id, &cancel))
            .await
            .unwrap();

        let sent = fx.rider_channel.sent_to(fx.rider.platform_id).await;
        assert_eq!(sent.last().unwrap().text, render::no_longer_available(order.id));
        assert_ne!(sent.last().unwrap().text, render::GENERIC_FAILURE);
        let stored = fx.ctx.storage.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::OnWay);
    }

    #[tokio::test]
    async fn repeated_rider_cancel_is_reported_not_raised() {
        let fx = Fixture::new().await;
        let order = fx.pending_order().await;
        let mut role_loop = RoleLoop::new(Role::Rider, fx.rider_channel.clone(), fx.ctx.clone());
        let cancel = Action::CancelOrder(order.id).to_string();

        role_loop
            .handle_inbound(button(fx.rider.platform_id, &cancel))
            .await
            .unwrap();
        fx.rider_channel.clear_sent().await;
        role_loop
            .handle_inbound(button(fx.rider.platform_id, &cancel))
            .await
            .unwrap();

        let sent = fx.rider_channel.sent_to(fx.rider.platform_id).await;
        assert_eq!(sent.last().unwrap().text, render::no_longer_available(order.id));
        let stored = fx.ctx.storage.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn wizard_step_after_restart_prompts_to_start_over() {
        let fx = Fixture::new().await;
        let mut role_loop = RoleLoop::new(Role::Rider, fx.rider_channel.clone(), fx.ctx.clone());
        let destination = fx.location("B").await;

        role_loop
            .handle_inbound(button(
                fx.rider.platform_id,
                &Action::PickDestination(destination).to_string(),
            ))
            .await
            .unwrap();

        let sent = fx.rider_channel.sent_to(fx.rider.platform_id).await;
        assert_eq!(sent.last().unwrap().text, render::restart_prompt().text);
        assert_eq!(role_loop.sessions().in_flight(), 0);
    }

    #[tokio::test]
    async fn unknown_payload_is_acknowledged_silently() {
        let fx = Fixture::new().await;
        let mut role_loop = driver_loop(&fx);
        role_loop.handle_inbound(button(1, "bogus")).await.unwrap();
        assert_eq!(fx.driver_channel.sent_count().await, 0);
        assert_eq!(fx.driver_channel.acks().await, vec![("cb1".to_string(), None)]);
    }

    #[tokio::test]
    async fn run_stops_when_channel_closes() {
        let fx = Fixture::new().await;
        let channel = Arc::new(MockChannel::new());
        channel.close().await;
        let mut role_loop = RoleLoop::new(Role::Rider, channel, fx.ctx.clone());
        role_loop.run(CancellationToken::new()).await.unwrap();
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let fx = Fixture::new().await;
        let token = CancellationToken::new();
        token.cancel();
        let mut role_loop = driver_loop(&fx);
        role_loop.run(token).await.unwrap();
    }
}
