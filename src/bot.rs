use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::Config;
use crate::dispatcher::{Dispatch, Dispatcher};
use crate::error::{Error, Result};
use crate::moderation::Moderator;
use crate::session::Session;
use crate::slack::{SlackClient, SlackMethods};

/// Connect to Slack and moderate until the connection ends.
pub async fn run(config: &Config) -> Result<()> {
    let api: Arc<dyn SlackMethods> = Arc::new(SlackClient::new(config.slack.clone()));

    info!("Connecting to Slack RTM...");
    let mut session = Session::connect(api.as_ref()).await?;

    let moderator = Moderator::new(Arc::new(config.policy.clone()), api)
        .with_self_id(session.identity().id.clone());
    let dispatcher = Dispatcher::new(moderator);

    process_events(&mut session, &dispatcher).await
}

/// Pull events one at a time and dispatch each to completion before reading
/// the next. A peer close ends the loop normally; any other failure closes the
/// session and is returned.
pub async fn process_events(session: &mut Session, dispatcher: &Dispatcher) -> Result<()> {
    while session.is_open() {
        let raw = match session.next_event().await {
            Ok(raw) => raw,
            Err(Error::ConnectionClosed) => break,
            Err(e) => {
                error!("RTM connection failed: {}", e);
                return Err(e);
            }
        };

        match dispatcher.dispatch(&raw).await {
            Ok(Dispatch::Moderated(verdict)) => debug!("Message verdict: {:?}", verdict),
            Ok(Dispatch::Ignored) => {}
            Err(e) => {
                error!("Closing RTM session: {}", e);
                session.close().await;
                return Err(e);
            }
        }
    }

    info!("RTM session ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::policy::{ModerationPolicy, UserMatch};
    use crate::moderation::DeleteCommand;
    use crate::session::SessionState;
    use crate::slack::SelfIdentity;
    use crate::testing::{MockSlack, ScriptedSource};
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn identity() -> SelfIdentity {
        SelfIdentity {
            id: "B1".to_string(),
            name: "blockbot".to_string(),
        }
    }

    fn dispatcher(api: Arc<MockSlack>) -> Dispatcher {
        let policy = ModerationPolicy::new(["C1"], ["U9"], UserMatch::Exact);
        Dispatcher::new(Moderator::new(Arc::new(policy), api).with_self_id("B1"))
    }

    #[tokio::test]
    async fn test_restricted_message_is_deleted_once() {
        let api = Arc::new(MockSlack::default());
        let source = ScriptedSource::new(vec![
            json!({"type": "hello"}),
            json!({"type": "message", "channel": "C1", "user": "U9", "ts": "169000.001"}),
        ]);
        let mut session = Session::new(Box::new(source), identity());

        process_events(&mut session, &dispatcher(api.clone())).await.unwrap();

        assert_eq!(
            api.deletes(),
            vec![DeleteCommand {
                channel: "C1".to_string(),
                ts: "169000.001".to_string(),
            }]
        );
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_wrong_channel_is_left_alone() {
        let api = Arc::new(MockSlack::default());
        let source = ScriptedSource::new(vec![
            json!({"type": "message", "channel": "C2", "user": "U9", "ts": "1"}),
        ]);
        let mut session = Session::new(Box::new(source), identity());

        process_events(&mut session, &dispatcher(api.clone())).await.unwrap();

        assert!(api.deletes().is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_closes_session_without_retry() {
        let api = Arc::new(MockSlack::failing("cant_delete_message"));
        let source = ScriptedSource::new(vec![
            json!({"type": "message", "channel": "C1", "user": "U9", "ts": "169000.001"}),
            json!({"type": "message", "channel": "C1", "user": "U9", "ts": "169000.002"}),
        ]);
        let closed = source.closed_flag();
        let mut session = Session::new(Box::new(source), identity());

        let err = process_events(&mut session, &dispatcher(api.clone()))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RemoteCall { .. }));
        assert_eq!(api.deletes().len(), 1);
        assert_eq!(api.deletes()[0].ts, "169000.001");
        assert!(!session.is_open());
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_error_frame_stops_processing() {
        let api = Arc::new(MockSlack::default());
        let source = ScriptedSource::new(vec![
            json!({"type": "error", "error": {"code": 1, "msg": "Socket URL has expired"}}),
            json!({"type": "message", "channel": "C1", "user": "U9", "ts": "3"}),
        ]);
        let mut session = Session::new(Box::new(source), identity());

        let err = process_events(&mut session, &dispatcher(api.clone()))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RemoteProtocol(ref msg) if msg == "Socket URL has expired"));
        assert!(api.deletes().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_returned() {
        let api = Arc::new(MockSlack::default());
        let source = ScriptedSource::new(vec![json!({"type": "hello"})])
            .then_fail(Error::Connection("reset by peer".to_string()));
        let mut session = Session::new(Box::new(source), identity());

        let err = process_events(&mut session, &dispatcher(api))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Connection(_)));
    }

    #[tokio::test]
    async fn test_own_and_unrelated_events_pass_through() {
        let api = Arc::new(MockSlack::default());
        let source = ScriptedSource::new(vec![
            json!({"type": "presence_change", "user": "U9"}),
            json!({"type": "message", "channel": "C1", "user": "B1", "ts": "4"}),
            json!({"type": "message", "subtype": "message_deleted", "channel": "C1", "ts": "5"}),
        ]);
        let mut session = Session::new(Box::new(source), identity());

        process_events(&mut session, &dispatcher(api.clone())).await.unwrap();

        assert!(api.deletes().is_empty());
    }
}
