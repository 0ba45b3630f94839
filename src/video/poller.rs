//! Drives an operation to completion.

use crate::error::{Result, VeoStudioError};
use crate::video::operation::Operation;
use crate::video::transport::OperationTransport;
use std::time::Duration;
use tokio::time::Instant;

/// Delay between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Polls `operation` through `transport` until its completion flag is set.
///
/// Each attempt waits `interval`, then replaces the snapshot with the one the
/// transport returns. Any refresh error ends the loop; nothing is retried.
/// Without a `timeout` the loop runs for as long as the provider reports the
/// job as pending. With one, the final wait ends at the deadline and no
/// refresh is issued past it.
pub async fn poll_until_done<T>(
    transport: &T,
    operation: Operation,
    interval: Duration,
    timeout: Option<Duration>,
) -> Result<Operation>
where
    T: OperationTransport + ?Sized,
{
    let start = Instant::now();
    let deadline = timeout.map(|limit| (start + limit, limit));
    let mut current = operation;
    let mut attempt: u32 = 0;

    while !current.done {
        let wait = match deadline {
            Some((at, _)) => interval.min(at.saturating_duration_since(Instant::now())),
            None => interval,
        };
        tokio::time::sleep(wait).await;

        // No refresh once the deadline has passed.
        if let Some((at, limit)) = deadline {
            if Instant::now() >= at {
                return Err(VeoStudioError::Timeout(limit));
            }
        }
        attempt += 1;

        tracing::debug!(
            operation = %current.name,
            attempt,
            elapsed_secs = start.elapsed().as_secs(),
            transport = %transport.kind(),
            "polling video generation"
        );
        current = transport.refresh(&current).await?;
    }

    tracing::debug!(operation = %current.name, attempts = attempt, "operation done");
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::request::PredictRequest;
    use crate::video::transport::TransportKind;
    use crate::video::types::VeoModel;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted snapshots and records what it was asked to refresh.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<Operation>>>,
        seen: Mutex<Vec<Operation>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<Operation>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl OperationTransport for ScriptedTransport {
        async fn submit(&self, _request: &PredictRequest, _model: VeoModel) -> Result<Operation> {
            unreachable!("poller never submits")
        }

        async fn refresh(&self, operation: &Operation) -> Result<Operation> {
            self.seen.lock().unwrap().push(operation.clone());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("refreshed more often than scripted")
        }

        fn kind(&self) -> TransportKind {
            TransportKind::Direct
        }
    }

    fn snapshot(done: bool, progress: u32) -> Operation {
        Operation {
            name: "operations/op".into(),
            done,
            metadata: Some(serde_json::json!({ "progress": progress })),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_exactly_when_done() {
        let transport = ScriptedTransport::new(vec![
            Ok(snapshot(false, 30)),
            Ok(snapshot(false, 60)),
            Ok(snapshot(true, 100)),
            Ok(snapshot(true, 100)),
        ]);

        let done = poll_until_done(&transport, snapshot(false, 0), DEFAULT_POLL_INTERVAL, None)
            .await
            .unwrap();

        assert!(done.done);
        assert_eq!(done.metadata.unwrap()["progress"], 100);
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_refresh_sees_latest_snapshot() {
        let transport = ScriptedTransport::new(vec![Ok(snapshot(false, 50)), Ok(snapshot(true, 100))]);

        poll_until_done(&transport, snapshot(false, 0), DEFAULT_POLL_INTERVAL, None)
            .await
            .unwrap();

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].metadata.as_ref().unwrap()["progress"], 0);
        assert_eq!(seen[1].metadata.as_ref().unwrap()["progress"], 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_done_makes_no_calls() {
        let transport = ScriptedTransport::new(vec![]);
        let done = poll_until_done(&transport, snapshot(true, 100), DEFAULT_POLL_INTERVAL, None)
            .await
            .unwrap();
        assert!(done.done);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_interval_before_each_check() {
        let transport = ScriptedTransport::new(vec![Ok(snapshot(false, 50)), Ok(snapshot(true, 100))]);
        let start = tokio::time::Instant::now();

        poll_until_done(&transport, snapshot(false, 0), DEFAULT_POLL_INTERVAL, None)
            .await
            .unwrap();

        assert!(start.elapsed() >= DEFAULT_POLL_INTERVAL * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_error_ends_loop() {
        let transport = ScriptedTransport::new(vec![
            Ok(snapshot(false, 10)),
            Err(VeoStudioError::Api {
                status: 503,
                message: "unavailable".into(),
            }),
            Ok(snapshot(true, 100)),
        ]);

        let err = poll_until_done(&transport, snapshot(false, 0), DEFAULT_POLL_INTERVAL, None)
            .await
            .unwrap_err();

        assert!(matches!(err, VeoStudioError::Api { status: 503, .. }));
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let transport = ScriptedTransport::new((0..10).map(|i| Ok(snapshot(false, i))).collect());

        let err = poll_until_done(
            &transport,
            snapshot(false, 0),
            DEFAULT_POLL_INTERVAL,
            Some(Duration::from_secs(25)),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, VeoStudioError::Timeout(_)));
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_shorter_than_interval_skips_refresh() {
        let transport = ScriptedTransport::new(vec![Ok(snapshot(true, 100))]);
        let start = tokio::time::Instant::now();

        let err = poll_until_done(
            &transport,
            snapshot(false, 0),
            Duration::from_secs(10),
            Some(Duration::from_secs(5)),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, VeoStudioError::Timeout(_)));
        assert_eq!(transport.calls(), 0);
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
