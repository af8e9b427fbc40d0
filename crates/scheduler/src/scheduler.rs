//! [`BirthdayScheduler`]: owns the roster and runs the refresh and dispatch timers.

use std::sync::Arc;
use std::time::Duration;

use ::cron::Schedule;
use birthday_core::projection::{is_today, notify_date, project_next};
use birthday_core::{BirthDate, Clock, Config, ContactSource, BIRTHDAY_FIELD};
use birthday_notify::{Delivery, Dispatcher, NotifierRegistry};
use chrono::{Local, NaiveDate};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cron::{parse_cron, until_next_fire};
use crate::error::SchedulerError;
use crate::offsets::AdvanceOffsets;
use crate::roster::{build_roster, BirthdayEntry, Roster};

/// Timer and offset settings.
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub fetch_interval: Duration,
    pub dispatch_schedule: Schedule,
    pub offsets: AdvanceOffsets,
}

impl SchedulerOptions {
    pub fn from_config(config: &Config) -> Result<Self, SchedulerError> {
        Ok(Self {
            fetch_interval: config.webdav.fetch_interval,
            dispatch_schedule: parse_cron(&config.dispatch_schedule)?,
            offsets: AdvanceOffsets::new(config.notify_days_in_advance.iter().copied()),
        })
    }
}

/// A reminder due today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub entry: BirthdayEntry,
    pub days_in_advance: u32,
}

/// What one dispatch pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    pub today: NaiveDate,
    pub roster_size: usize,
    pub matches: usize,
    /// Deliveries handed to the dispatcher; they may still be running.
    pub deliveries: usize,
}

pub struct BirthdayScheduler {
    source: Arc<dyn ContactSource>,
    clock: Arc<dyn Clock>,
    registry: NotifierRegistry,
    dispatcher: Arc<Dispatcher>,
    options: SchedulerOptions,
    roster: Roster,
    shutdown: watch::Sender<bool>,
}

impl BirthdayScheduler {
    pub fn new(
        source: Arc<dyn ContactSource>,
        clock: Arc<dyn Clock>,
        registry: NotifierRegistry,
        dispatcher: Arc<Dispatcher>,
        options: SchedulerOptions,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            source,
            clock,
            registry,
            dispatcher,
            options,
            roster: Roster::new(),
            shutdown,
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Fetch contacts and swap in a new roster.
    ///
    /// On error the current roster is left as it is.
    pub async fn refresh(&self) -> Result<usize, SchedulerError> {
        let records = self
            .source
            .list_contacts_with_field(BIRTHDAY_FIELD)
            .await?;
        let fetched = records.len();

        let entries = build_roster(records);
        let birthdays = entries.len();
        let previous = self.roster.replace(entries);

        info!(
            source = self.source.source_name(),
            fetched,
            birthdays,
            previous,
            "roster refreshed"
        );
        Ok(birthdays)
    }

    /// Every (entry, offset) pair whose reminder is due on `today`.
    pub fn matches(&self, today: NaiveDate) -> Vec<Match> {
        self.evaluate(today).1
    }

    fn evaluate(&self, today: NaiveDate) -> (usize, Vec<Match>) {
        self.roster.with_entries(|entries| {
            let mut matches = Vec::new();
            for entry in entries {
                let next = project_next(entry.birth, today);
                for days in self.options.offsets.iter() {
                    let due = notify_date(next, days);
                    if is_today(BirthDate::from(due), today) {
                        matches.push(Match {
                            entry: entry.clone(),
                            days_in_advance: days,
                        });
                    }
                }
            }
            (entries.len(), matches)
        })
    }

    /// Evaluate the roster for `today` and hand one delivery per match and
    /// channel to the dispatcher. Does not wait for the deliveries.
    pub fn dispatch_pass(&self, today: NaiveDate) -> DispatchSummary {
        let (roster_size, matches) = self.evaluate(today);

        let mut deliveries = 0;
        for m in &matches {
            info!(
                contact = m.entry.contact.display_name(),
                birthday = %m.entry.birth,
                days_in_advance = m.days_in_advance,
                "birthday reminder due"
            );
            for channel in self.registry.channels() {
                self.dispatcher.submit(Delivery {
                    notifier: channel.notifier.clone(),
                    settings: channel.settings.clone(),
                    contact: m.entry.contact.clone(),
                    when: m.entry.birth,
                });
                deliveries += 1;
            }
        }

        let summary = DispatchSummary {
            today,
            roster_size,
            matches: matches.len(),
            deliveries,
        };
        info!(
            today = %summary.today,
            roster = summary.roster_size,
            matches = summary.matches,
            deliveries = summary.deliveries,
            "dispatch pass complete"
        );
        summary
    }

    /// Refresh every `fetch_interval` until [`BirthdayScheduler::shutdown`].
    ///
    /// The first refresh happens one interval after start; the initial fetch
    /// is the caller's job.
    pub async fn run_refresh_loop(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();
        let period = self.options.fetch_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = period.as_secs(), "refresh loop started");
        while !*shutdown.borrow() {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.refresh().await {
                        warn!(error = %e, "refresh failed, keeping previous roster");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
        info!("refresh loop stopped");
    }

    /// Run a dispatch pass at every cron fire time (local time).
    pub async fn run_dispatch_loop(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();

        info!("dispatch loop started");
        while !*shutdown.borrow() {
            let now = Local::now();
            let Some(wait) = until_next_fire(&self.options.dispatch_schedule, &now) else {
                warn!("dispatch schedule has no upcoming fire time");
                break;
            };
            debug!(wait_secs = wait.as_secs(), "waiting for next dispatch");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    self.dispatch_pass(self.clock.today());
                }
                _ = shutdown.changed() => break,
            }
        }
        info!("dispatch loop stopped");
    }

    /// Ask both loops to stop. In-flight deliveries are not affected; flush
    /// the dispatcher to wait for them.
    pub fn shutdown(&self) {
        info!("scheduler shutdown requested");
        self.shutdown.send_replace(true);
    }
}

impl std::fmt::Debug for BirthdayScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BirthdayScheduler")
            .field("source", &self.source.source_name())
            .field("channels", &self.registry.len())
            .field("options", &self.options)
            .field("roster", &self.roster.len())
            .finish_non_exhaustive()
    }
}
