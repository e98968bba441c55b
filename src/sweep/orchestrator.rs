//! # Sweep Orchestrator
//!
//! One cycle:
//!
//! 1. Listing: snapshot the subscriber list; failure aborts the cycle
//! 2. Checking / Notifying: one pipeline per subscriber, at most
//!    `workers` at a time; each pipeline checks, then (only if hazardous)
//!    notifies with bounded retries
//! 3. Reporting: aggregate outcomes, update counters, log the summary
//!
//! Cycles never overlap: [`Sweeper::run`] awaits each cycle before waiting
//! for the next tick.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::backoff::RetryPolicy;
use super::config::SweepConfig;
use super::errors::{SweepError, SweepResult};
use super::phase::{PhaseCell, SweepPhase};
use super::summary::{Outcome, SubscriberReport, SweepSummary};
use crate::hazard::HazardCheck;
use crate::notifier::{Notifier, SendError};
use crate::observability::{
    log_event_at, log_event_with_fields, AlertMetrics, Event, Severity,
};
use crate::store::{StoreError, Subscriber, SubscriberSource};

/// Periodic hazard sweep over all subscribers
pub struct Sweeper {
    source: Arc<dyn SubscriberSource>,
    hazard: Arc<dyn HazardCheck>,
    notifier: Notifier,
    config: SweepConfig,
    metrics: Arc<AlertMetrics>,
    phase: Arc<PhaseCell>,
}

impl Sweeper {
    pub fn new(
        source: Arc<dyn SubscriberSource>,
        hazard: Arc<dyn HazardCheck>,
        notifier: Notifier,
        config: SweepConfig,
    ) -> Self {
        Self {
            source,
            hazard,
            notifier,
            config,
            metrics: Arc::new(AlertMetrics::new()),
            phase: Arc::new(PhaseCell::new()),
        }
    }

    /// Share a process-wide counter registry
    pub fn with_metrics(mut self, metrics: Arc<AlertMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<AlertMetrics> {
        &self.metrics
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Phase of the cycle in progress, `Idle` between cycles
    pub fn phase(&self) -> SweepPhase {
        self.phase.get()
    }

    /// Run cycles on the configured interval until `cancel` fires
    ///
    /// Returns the number of cycles started. The first cycle starts
    /// immediately; ticks missed by a long cycle are skipped.
    pub async fn run(&self, cancel: CancellationToken) -> u64 {
        let mut ticker = time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut cycles = 0;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            cycles += 1;
            // Aborted cycles are logged inside run_once; the next tick retries.
            let _ = self.run_once(&cancel).await;
        }
        cycles
    }

    /// Run exactly one cycle
    ///
    /// Errors only if the subscriber list cannot be read. If `cancel` fires
    /// mid-cycle, subscribers not yet started are reported as cancelled and
    /// in-flight pipelines get the shutdown grace period before they are
    /// aborted.
    pub async fn run_once(&self, cancel: &CancellationToken) -> SweepResult<SweepSummary> {
        let sweep_id = Uuid::new_v4();
        let sweep_id_str = sweep_id.to_string();
        let mut summary = SweepSummary::new(sweep_id, Utc::now());

        // Listing
        self.phase.advance(SweepPhase::Listing);
        log_event_with_fields(Event::SweepBegin, &[("sweep_id", sweep_id_str.as_str())]);

        // The store blocks on its file lock while another process writes
        let source = self.source.clone();
        let listed = tokio::task::spawn_blocking(move || source.list())
            .await
            .unwrap_or_else(|e| Err(StoreError::Internal(format!("listing task failed: {}", e))));

        let subscribers = match listed {
            Ok(subscribers) => subscribers,
            Err(e) => {
                self.metrics.increment_sweeps_aborted();
                // Fatal for this cycle only; `run` keeps ticking.
                log_event_with_fields(
                    Event::SweepAborted,
                    &[
                        ("sweep_id", sweep_id_str.as_str()),
                        ("fatal_scope", "cycle"),
                        ("reason", e.to_string().as_str()),
                    ],
                );
                self.phase.reset();
                return Err(SweepError::StoreUnavailable(e));
            }
        };

        // Checking / Notifying
        self.phase.advance(SweepPhase::Checking);
        let pipeline = Arc::new(Pipeline {
            sweep_id: sweep_id_str.clone(),
            hazard: self.hazard.clone(),
            notifier: self.notifier.clone(),
            retry: self.config.retry,
            check_timeout: self.config.check_timeout(),
            notify_timeout: self.config.notify_timeout(),
            phase: self.phase.clone(),
        });
        let permits = Arc::new(Semaphore::new(self.config.workers));

        let mut pending = BTreeMap::new();
        let mut tasks = JoinSet::new();
        for (index, subscriber) in subscribers.into_iter().enumerate() {
            let attempts = Arc::new(AtomicU32::new(0));
            pending.insert(index, (subscriber.clone(), attempts.clone()));

            let pipeline = pipeline.clone();
            let permits = permits.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let _permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return (index, cancelled(subscriber, 0)),
                    permit = permits.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return (index, cancelled(subscriber, 0)),
                    },
                };
                (index, pipeline.process(subscriber, &attempts).await)
            });
        }

        let grace = self.config.shutdown_grace();
        let grace_expired = async {
            cancel.cancelled().await;
            time::sleep(grace).await;
        };
        tokio::pin!(grace_expired);
        let mut aborted = false;

        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok((index, report))) => {
                        pending.remove(&index);
                        summary.record(report);
                    }
                    // Aborted after the grace period; accounted for below
                    Some(Err(_)) => {}
                },
                _ = &mut grace_expired, if !aborted => {
                    aborted = true;
                    log_event_at(
                        Severity::Warn,
                        Event::SweepGraceExpired,
                        &[
                            ("sweep_id", sweep_id_str.as_str()),
                            ("in_flight", tasks.len().to_string().as_str()),
                        ],
                    );
                    tasks.abort_all();
                }
            }
        }

        // Aborted pipelines keep the send attempts they already made
        for (_, (subscriber, attempts)) in pending {
            summary.record(cancelled(subscriber, attempts.load(Ordering::SeqCst)));
        }

        // Reporting
        self.phase.advance(SweepPhase::Reporting);
        summary.finish();
        self.record_metrics(&summary);

        let fields = summary.log_fields();
        let field_refs: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        log_event_with_fields(Event::SweepComplete, &field_refs);

        self.phase.reset();
        Ok(summary)
    }

    fn record_metrics(&self, summary: &SweepSummary) {
        self.metrics.increment_sweeps_completed();
        self.metrics.add_safe(summary.safe as u64);
        self.metrics.add_notifications_sent(summary.notified as u64);
        self.metrics.add_check_failures(summary.check_failed as u64);
        self.metrics.add_notify_failures(summary.notify_failed as u64);
        self.metrics.add_send_attempts(u64::from(summary.send_attempts()));
        self.metrics.add_cancelled(summary.cancelled as u64);
    }
}

fn cancelled(subscriber: Subscriber, attempts: u32) -> SubscriberReport {
    SubscriberReport {
        email: subscriber.email,
        location: subscriber.location,
        outcome: Outcome::Cancelled { attempts },
    }
}

/// Everything one subscriber pipeline needs, shared by all pipelines of a
/// cycle
struct Pipeline {
    sweep_id: String,
    hazard: Arc<dyn HazardCheck>,
    notifier: Notifier,
    retry: RetryPolicy,
    check_timeout: Duration,
    notify_timeout: Duration,
    phase: Arc<PhaseCell>,
}

impl Pipeline {
    /// Check, then notify if hazardous. Never fails: every path ends in an
    /// outcome, including a panic inside the check or the transport.
    ///
    /// `attempts` counts send attempts as they start, so a pipeline aborted
    /// mid-send still accounts for them.
    async fn process(&self, subscriber: Subscriber, attempts: &AtomicU32) -> SubscriberReport {
        let outcome = match AssertUnwindSafe(self.evaluate(&subscriber, attempts))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => Outcome::CheckFailed {
                reason: "subscriber pipeline panicked".to_string(),
            },
        };

        self.log_outcome(&subscriber, &outcome);

        SubscriberReport {
            email: subscriber.email,
            location: subscriber.location,
            outcome,
        }
    }

    async fn evaluate(&self, subscriber: &Subscriber, attempts: &AtomicU32) -> Outcome {
        let (x, y) = (subscriber.location.x, subscriber.location.y);

        match time::timeout(self.check_timeout, self.hazard.check(x, y)).await {
            Err(_) => Outcome::CheckFailed {
                reason: format!(
                    "hazard check exceeded {}ms",
                    self.check_timeout.as_millis()
                ),
            },
            Ok(Err(e)) => Outcome::CheckFailed {
                reason: e.to_string(),
            },
            Ok(Ok(false)) => Outcome::Safe,
            Ok(Ok(true)) => {
                log_event_with_fields(
                    Event::HazardDetected,
                    &[
                        ("sweep_id", self.sweep_id.as_str()),
                        ("email", subscriber.email.as_str()),
                        ("x", x.to_string().as_str()),
                        ("y", y.to_string().as_str()),
                    ],
                );
                self.phase.advance(SweepPhase::Notifying);
                self.deliver(subscriber, attempts).await
            }
        }
    }

    /// Send with bounded retries; permanent errors are not retried
    async fn deliver(&self, subscriber: &Subscriber, attempts: &AtomicU32) -> Outcome {
        let (x, y) = (subscriber.location.x, subscriber.location.y);
        let max_attempts = self.retry.max_attempts;

        for attempt in 0..max_attempts {
            attempts.fetch_add(1, Ordering::SeqCst);
            let result = match time::timeout(
                self.notify_timeout,
                self.notifier.notify(&subscriber.email, x, y),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(SendError::Timeout(self.notify_timeout.as_millis() as u64)),
            };

            let error = match result {
                Ok(()) => {
                    return Outcome::Notified {
                        attempts: attempt + 1,
                    }
                }
                Err(e) => e,
            };

            if error.is_permanent() || attempt + 1 >= max_attempts {
                return Outcome::NotifyFailed {
                    attempts: attempt + 1,
                    reason: error.to_string(),
                };
            }

            let delay = self.retry.delay(attempt);
            log_event_at(
                Severity::Warn,
                Event::NotifyRetry,
                &[
                    ("sweep_id", self.sweep_id.as_str()),
                    ("email", subscriber.email.as_str()),
                    ("attempt", (attempt + 1).to_string().as_str()),
                    ("delay_ms", delay.as_millis().to_string().as_str()),
                    ("reason", error.to_string().as_str()),
                ],
            );
            time::sleep(delay).await;
        }

        Outcome::NotifyFailed {
            attempts: 0,
            reason: "no send attempts configured".to_string(),
        }
    }

    fn log_outcome(&self, subscriber: &Subscriber, outcome: &Outcome) {
        let mut fields = vec![
            ("sweep_id", self.sweep_id.clone()),
            ("email", subscriber.email.clone()),
        ];

        let (severity, event) = match outcome {
            Outcome::Safe => (Severity::Info, Event::SubscriberSafe),
            Outcome::Notified { attempts } => {
                fields.push(("attempts", attempts.to_string()));
                (Severity::Info, Event::NotifySent)
            }
            Outcome::CheckFailed { reason } => {
                fields.push(("reason", reason.clone()));
                (Severity::Warn, Event::CheckFailed)
            }
            Outcome::NotifyFailed { attempts, reason } => {
                fields.push(("attempts", attempts.to_string()));
                fields.push(("reason", reason.clone()));
                (Severity::Error, Event::NotifyFailed)
            }
            Outcome::Cancelled { .. } => return,
        };

        let field_refs: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        log_event_at(severity, event, &field_refs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hazard::{CheckError, CheckResult};
    use crate::notifier::{MailTransport, MemoryTransport, OutgoingMail, SendResult};
    use crate::store::StoreResult;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;

    struct FixedSource(Vec<Subscriber>);

    impl SubscriberSource for FixedSource {
        fn list(&self) -> StoreResult<Vec<Subscriber>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenSource;

    impl SubscriberSource for BrokenSource {
        fn list(&self) -> StoreResult<Vec<Subscriber>> {
            Err(StoreError::Io("disk gone".into()))
        }
    }

    /// Hazardous where x > 0, errors where x is exactly 0
    struct SignCheck;

    #[async_trait]
    impl HazardCheck for SignCheck {
        async fn check(&self, x: f64, _y: f64) -> CheckResult<bool> {
            if x == 0.0 {
                Err(CheckError::Status(503))
            } else {
                Ok(x > 0.0)
            }
        }
    }

    fn fast_config() -> SweepConfig {
        SweepConfig {
            retry: RetryPolicy {
                first: Duration::from_millis(5),
                max: Duration::from_millis(20),
                ..RetryPolicy::default()
            },
            ..SweepConfig::default()
        }
    }

    fn sweeper(
        subscribers: Vec<Subscriber>,
        transport: Arc<MemoryTransport>,
    ) -> Sweeper {
        Sweeper::new(
            Arc::new(FixedSource(subscribers)),
            Arc::new(SignCheck),
            Notifier::dry_run(transport, "alerts@example.com"),
            fast_config(),
        )
    }

    fn sub(email: &str, x: f64) -> Subscriber {
        Subscriber::new(email, x, 1.0).unwrap()
    }

    #[tokio::test]
    async fn test_mixed_outcomes() {
        let transport = Arc::new(MemoryTransport::new());
        let sweeper = sweeper(
            vec![sub("safe@x.com", -1.0), sub("danger@x.com", 1.0), sub("err@x.com", 0.0)],
            transport.clone(),
        );

        let summary = sweeper.run_once(&CancellationToken::new()).await.unwrap();

        assert_eq!(summary.safe, 1);
        assert_eq!(summary.notified, 1);
        assert_eq!(summary.check_failed, 1);
        assert_eq!(transport.sent_count(), 1);
        assert_eq!(transport.sent()[0].to, vec!["danger@x.com".to_string()]);
        assert_eq!(sweeper.phase(), SweepPhase::Idle);
    }

    #[tokio::test]
    async fn test_broken_source_aborts() {
        let transport = Arc::new(MemoryTransport::new());
        let sweeper = Sweeper::new(
            Arc::new(BrokenSource),
            Arc::new(SignCheck),
            Notifier::dry_run(transport.clone(), "alerts@example.com"),
            fast_config(),
        );

        let result = sweeper.run_once(&CancellationToken::new()).await;

        assert!(matches!(result, Err(SweepError::StoreUnavailable(_))));
        assert_eq!(sweeper.metrics().snapshot().sweeps_aborted, 1);
        assert_eq!(sweeper.phase(), SweepPhase::Idle);
    }

    #[tokio::test]
    async fn test_exhausted_retries() {
        let transport = Arc::new(MemoryTransport::always_failing());
        let sweeper = sweeper(vec![sub("danger@x.com", 1.0)], transport.clone());

        let summary = sweeper.run_once(&CancellationToken::new()).await.unwrap();

        assert_eq!(summary.notify_failed, 1);
        assert_eq!(transport.attempts(), 3);
        assert_eq!(summary.reports[0].outcome.attempts(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let transport = Arc::new(MemoryTransport::new());
        let sweeper = sweeper(vec![sub("a@x.com", 1.0), sub("b@x.com", 1.0)], transport.clone());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let summary = sweeper.run_once(&cancel).await.unwrap();

        assert_eq!(summary.cancelled, 2);
        assert_eq!(transport.attempts(), 0);
    }

    /// First delivery fails transiently, every later one never returns
    struct StallAfterFailure {
        failed: AtomicBool,
    }

    #[async_trait]
    impl MailTransport for StallAfterFailure {
        async fn deliver(&self, _mail: &OutgoingMail) -> SendResult<()> {
            if !self.failed.swap(true, Ordering::SeqCst) {
                return Err(SendError::Transport("connection reset".into()));
            }
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_aborted_pipeline_keeps_send_attempts() {
        let config = SweepConfig {
            shutdown_grace_secs: 0,
            ..fast_config()
        };
        let transport = Arc::new(StallAfterFailure {
            failed: AtomicBool::new(false),
        });
        let sweeper = Sweeper::new(
            Arc::new(FixedSource(vec![sub("danger@x.com", 1.0)])),
            Arc::new(SignCheck),
            Notifier::new(transport, "alerts@example.com", false),
            config,
        );

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let summary = sweeper.run_once(&cancel).await.unwrap();

        assert_eq!(summary.cancelled, 1);
        assert!(matches!(
            summary.reports[0].outcome,
            Outcome::Cancelled { attempts: 2 }
        ));
        assert_eq!(summary.send_attempts(), 2);
        assert_eq!(sweeper.metrics().snapshot().send_attempts, 2);
    }

    #[tokio::test]
    async fn test_metrics_accumulate_across_sweeps() {
        let transport = Arc::new(MemoryTransport::new());
        let sweeper = sweeper(vec![sub("a@x.com", 1.0), sub("b@x.com", -1.0)], transport);

        sweeper.run_once(&CancellationToken::new()).await.unwrap();
        sweeper.run_once(&CancellationToken::new()).await.unwrap();

        let snapshot = sweeper.metrics().snapshot();
        assert_eq!(snapshot.sweeps_completed, 2);
        assert_eq!(snapshot.notifications_sent, 2);
        assert_eq!(snapshot.subscribers_safe, 2);
        assert_eq!(snapshot.send_attempts, 2);
    }
}
