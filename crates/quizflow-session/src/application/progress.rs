//! Fire-and-forget progress reporting to the remote session log.

use std::sync::Arc;
use std::time::Duration;

use quizflow_core::gateway::{CompleteRequest, SaveStepRequest, SessionLog, call_with_timeout};
use quizflow_core::response::Response;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// Spawns `save_step` calls without blocking the caller.
///
/// Failures are logged and never retried. `drain` waits for everything
/// spawned so far, which lets shutdown and tests observe completion.
#[derive(Clone)]
pub struct ProgressReporter {
    log: Option<Arc<dyn SessionLog>>,
    tracker: TaskTracker,
    timeout: Duration,
}

impl ProgressReporter {
    /// Creates a reporter. With no log configured every report is a no-op.
    #[must_use]
    pub fn new(log: Option<Arc<dyn SessionLog>>, timeout: Duration) -> Self {
        Self {
            log,
            tracker: TaskTracker::new(),
            timeout,
        }
    }

    /// Reports the response list after a new answer.
    ///
    /// Skipped when there is no remote session handle.
    pub fn report(&self, session_id: Option<&str>, responses: &[Response], total_steps: usize) {
        let (Some(log), Some(session_id)) = (self.log.clone(), session_id) else {
            debug!("no remote session handle; skipping progress report");
            return;
        };
        let request = SaveStepRequest {
            session_id: session_id.to_owned(),
            responses: responses.to_vec(),
            step_number: responses.len(),
            total_steps,
        };
        let timeout = self.timeout;
        self.tracker.spawn(async move {
            let step = request.step_number;
            if let Err(e) = call_with_timeout(timeout, log.save_step(request)).await {
                warn!(step, error = %e, "progress report failed");
            }
        });
    }

    /// Records the completed run in the remote log.
    pub fn report_completion(&self, request: CompleteRequest) {
        let Some(log) = self.log.clone() else {
            return;
        };
        let timeout = self.timeout;
        self.tracker.spawn(async move {
            let quiz_id = request.quiz_id.clone();
            match call_with_timeout(timeout, log.complete(request)).await {
                Ok(session_id) => debug!(%quiz_id, %session_id, "completion recorded"),
                Err(e) => warn!(%quiz_id, error = %e, "failed to record completion"),
            }
        });
    }

    /// Waits for every in-flight report to finish.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use quizflow_core::gateway::GatewayError;
    use quizflow_test_support::ScriptedCollaborators;

    fn response(index: usize) -> Response {
        Response {
            question_index: index,
            question_id: format!("q{}", index + 1),
            question_text: "Base".to_owned(),
            selected_label: "A".to_owned(),
            value: "a".to_owned(),
            is_custom: false,
            answered_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_report_sends_step_number_equal_to_response_count() {
        // Arrange
        let log = Arc::new(ScriptedCollaborators::new());
        let reporter = ProgressReporter::new(Some(log.clone()), Duration::from_secs(1));

        // Act
        reporter.report(Some("remote-1"), &[response(0), response(1)], 4);
        reporter.drain().await;

        // Assert
        let steps = log.save_steps();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].session_id, "remote-1");
        assert_eq!(steps[0].step_number, 2);
        assert_eq!(steps[0].total_steps, 4);
    }

    #[tokio::test]
    async fn test_report_without_handle_is_skipped() {
        let log = Arc::new(ScriptedCollaborators::new());
        let reporter = ProgressReporter::new(Some(log.clone()), Duration::from_secs(1));

        reporter.report(None, &[response(0)], 4);
        reporter.drain().await;

        assert!(log.save_steps().is_empty());
    }

    #[tokio::test]
    async fn test_failed_report_does_not_affect_later_reports() {
        let log = Arc::new(
            ScriptedCollaborators::new()
                .with_save_step(Err(GatewayError::Transport("reset".to_owned()))),
        );
        let reporter = ProgressReporter::new(Some(log.clone()), Duration::from_secs(1));

        reporter.report(Some("remote-1"), &[response(0)], 4);
        reporter.drain().await;
        reporter.report(Some("remote-1"), &[response(0), response(1)], 4);
        reporter.drain().await;

        assert_eq!(log.save_steps().len(), 2);
    }
}
