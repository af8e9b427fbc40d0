//! Fire-and-forget delivery of reminders.
//!
//! Each delivery runs as its own task; a semaphore bounds how many talk to
//! the network at once. Submitting never waits. Individual channel failures
//! don't block other channels and are only logged.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use birthday_core::{BirthDate, Contact, Settings};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::traits::{DispatchResult, Notifier};

/// Everything one delivery attempt needs.
#[derive(Clone)]
pub struct Delivery {
    pub notifier: Arc<dyn Notifier>,
    pub settings: Settings,
    pub contact: Contact,
    pub when: BirthDate,
}

/// Runs deliveries concurrently, at most `max_in_flight` at a time.
pub struct Dispatcher {
    semaphore: Arc<Semaphore>,
    tasks: Mutex<JoinSet<DispatchResult>>,
}

impl Dispatcher {
    /// `max_in_flight` is clamped to at least 1.
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_in_flight.max(1))),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Start a delivery in the background. Must be called inside a Tokio runtime.
    pub fn submit(&self, delivery: Delivery) {
        let semaphore = self.semaphore.clone();
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);

        // Reap finished tasks so the set does not grow across passes.
        while tasks.try_join_next().is_some() {}

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            deliver(delivery).await
        });
    }

    /// Deliveries submitted but not yet collected.
    pub fn in_flight(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Wait for every submitted delivery and return their outcomes.
    ///
    /// Outcomes of tasks already reaped by [`Dispatcher::submit`] are not
    /// included.
    pub async fn flush(&self) -> Vec<DispatchResult> {
        let mut tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => tracing::error!(error = %e, "delivery task panicked"),
            }
        }
        results
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("available_permits", &self.semaphore.available_permits())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

async fn deliver(delivery: Delivery) -> DispatchResult {
    let Delivery {
        notifier,
        settings,
        contact,
        when,
    } = delivery;
    let channel = notifier.channel_name().to_string();
    let name = contact
        .formatted_name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| contact.display_name().to_string());

    let start = Instant::now();
    let result = notifier.send_notification(&settings, &contact, when).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    let (success, error) = match result {
        Ok(()) => {
            tracing::info!(channel = %channel, contact = %name, duration_ms, "Notification delivered");
            (true, None)
        }
        Err(e) => {
            tracing::warn!(
                channel = %channel,
                contact = %name,
                error = %e,
                duration_ms,
                "Notification delivery failed"
            );
            (false, Some(e.to_string()))
        }
    };

    DispatchResult {
        channel,
        contact: name,
        success,
        error,
        duration_ms,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::traits::NotifyError;

    struct MockNotifier {
        name: String,
        send_count: Arc<AtomicUsize>,
        should_fail: bool,
    }

    #[async_trait::async_trait]
    impl Notifier for MockNotifier {
        fn validate_settings(&self, _settings: &Settings) -> Result<(), NotifyError> {
            Ok(())
        }

        async fn send_notification(
            &self,
            _settings: &Settings,
            _contact: &Contact,
            _when: BirthDate,
        ) -> Result<(), NotifyError> {
            self.send_count.fetch_add(1, Ordering::SeqCst);
            if self.should_fail {
                Err(NotifyError::Settings("mock failure".to_string()))
            } else {
                Ok(())
            }
        }

        fn channel_name(&self) -> &str {
            &self.name
        }
    }

    /// Tracks how many sends overlap.
    struct SlowNotifier {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Notifier for SlowNotifier {
        fn validate_settings(&self, _settings: &Settings) -> Result<(), NotifyError> {
            Ok(())
        }

        async fn send_notification(
            &self,
            _settings: &Settings,
            _contact: &Contact,
            _when: BirthDate,
        ) -> Result<(), NotifyError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }

        fn channel_name(&self) -> &str {
            "slow"
        }
    }

    fn delivery(notifier: Arc<dyn Notifier>, name: &str) -> Delivery {
        Delivery {
            notifier,
            settings: Settings::new(),
            contact: Contact {
                formatted_name: Some(name.to_string()),
                ..Default::default()
            },
            when: BirthDate::new(1996, 10, 19).unwrap(),
        }
    }

    fn mock(name: &str, count: &Arc<AtomicUsize>, should_fail: bool) -> Arc<dyn Notifier> {
        Arc::new(MockNotifier {
            name: name.to_string(),
            send_count: count.clone(),
            should_fail,
        })
    }

    #[tokio::test]
    async fn delivers_to_all_channels() {
        let count_a = Arc::new(AtomicUsize::new(0));
        let count_b = Arc::new(AtomicUsize::new(0));

        let dispatcher = Dispatcher::new(4);
        dispatcher.submit(delivery(mock("a", &count_a, false), "Joe"));
        dispatcher.submit(delivery(mock("b", &count_b, false), "Joe"));

        let results = dispatcher.flush().await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(count_a.load(Ordering::SeqCst), 1);
        assert_eq!(count_b.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn partial_failure_doesnt_block() {
        let failed = Arc::new(AtomicUsize::new(0));
        let count = Arc::new(AtomicUsize::new(0));

        let dispatcher = Dispatcher::new(1);
        dispatcher.submit(delivery(mock("fail", &failed, true), "Ann"));
        dispatcher.submit(delivery(mock("ok", &count, false), "Ann"));

        let mut results = dispatcher.flush().await;
        results.sort_by(|a, b| a.channel.cmp(&b.channel));
        assert_eq!(results.len(), 2);
        assert!(!results[0].success);
        assert_eq!(results[0].contact, "Ann");
        assert_eq!(results[0].error.as_deref(), Some("Invalid settings: mock failure"));
        assert!(results[1].success);
        assert_eq!(count.load(Ordering::SeqCst), 1); // second channel still sent
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let slow = Arc::new(SlowNotifier {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });

        let dispatcher = Dispatcher::new(2);
        for i in 0..6 {
            dispatcher.submit(delivery(slow.clone(), &format!("c{i}")));
        }
        let results = dispatcher.flush().await;

        assert_eq!(results.len(), 6);
        assert!(slow.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn flush_on_idle_dispatcher_is_empty() {
        let dispatcher = Dispatcher::new(0);
        assert!(dispatcher.flush().await.is_empty());
    }
}
