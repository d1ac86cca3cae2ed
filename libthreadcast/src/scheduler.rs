//! Scheduled thread publishing
//!
//! The scheduler polls the pending threads and publishes those whose time
//! has come. A thread that fails with a network or rate-limit error keeps
//! the ids of the tweets it already published; after `error_backoff` it
//! resumes at the tweet that failed. Any other failure abandons that thread
//! for the rest of the run, and so does a `scheduled_time` that cannot be
//! parsed. Abandoned threads stay in the posts file and the other threads
//! are still published.
//!
//! The run ends once nothing is left that could be published. If any thread
//! was abandoned, the first such error is returned.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::error::{Result, ThreadcastError};
use crate::poster::{is_transient_error, Poster};
use crate::scheduling::is_due;
use crate::store::ThreadStore;

pub struct Scheduler<'a> {
    poster: &'a Poster,
    store: ThreadStore,
    failures: Vec<ThreadcastError>,
}

impl<'a> Scheduler<'a> {
    pub fn new(poster: &'a Poster, store: ThreadStore) -> Self {
        Self {
            poster,
            store,
            failures: Vec::new(),
        }
    }

    pub fn store(&self) -> &ThreadStore {
        &self.store
    }

    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.poster.settings().timezone)
    }

    fn abandon(&mut self, index: usize, error: ThreadcastError) {
        if let Some(progress) = self.store.progress_mut(index) {
            progress.abandoned = true;
        }
        self.failures.push(error);
    }

    /// Publish every thread due at `now`, returning how many were published
    ///
    /// # Errors
    ///
    /// Returns a transient error as soon as one occurs, leaving the failed
    /// thread's progress recorded in the store. Permanent failures abandon
    /// the thread and do not stop the tick.
    pub async fn tick(&mut self, now: DateTime<Tz>) -> Result<usize> {
        let mut published = 0;
        let mut index = 0;

        while index < self.store.len() {
            if self.store.progress(index).is_some_and(|p| p.abandoned) {
                index += 1;
                continue;
            }

            let thread = &self.store.threads()[index];
            match is_due(thread, now) {
                Ok(true) => {}
                Ok(false) => {
                    index += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Skipping thread for the rest of this run: {}", e);
                    self.abandon(index, e);
                    index += 1;
                    continue;
                }
            }

            let thread = thread.clone();
            let mut posted = self
                .store
                .progress_mut(index)
                .map(|p| std::mem::take(&mut p.posted_ids))
                .unwrap_or_default();

            match (thread.scheduled_time.as_deref(), posted.len()) {
                (_, done) if done > 0 => info!(
                    "Resuming thread after {} of {} tweets",
                    done,
                    thread.tweets.len()
                ),
                (Some(time), _) => info!("Posting thread scheduled for {}", time),
                (None, _) => info!("Posting unscheduled thread"),
            }

            match self.poster.resume_thread(&thread, &mut posted).await {
                Ok(()) => {
                    // Removing the thread shifts the next one into `index`
                    self.store.complete(index, posted)?;
                    published += 1;
                }
                Err(e) => {
                    let done = posted.len();
                    if let Some(progress) = self.store.progress_mut(index) {
                        progress.posted_ids = posted;
                    }
                    if is_transient_error(&e) {
                        return Err(e);
                    }

                    error!(
                        "Abandoning thread after {} of {} tweets: {}",
                        done,
                        thread.tweets.len(),
                        e
                    );
                    self.abandon(index, e);
                    index += 1;
                }
            }
        }

        Ok(published)
    }

    /// Run until no pending thread can still be published
    pub async fn run(&mut self) -> Result<()> {
        let settings = *self.poster.settings();
        info!(
            "Starting scheduled posting mode ({} pending, times in {})",
            self.store.len(),
            settings.timezone.name()
        );

        loop {
            if self.store.postable() == 0 {
                return self.finish();
            }

            let now = self.now();
            match self.tick(now).await {
                Ok(_) => {
                    if self.store.postable() == 0 {
                        continue;
                    }
                    sleep(settings.poll_interval).await;
                }
                Err(e) if is_transient_error(&e) => {
                    error!("Error in scheduler loop: {}", e);
                    sleep(settings.error_backoff).await;
                }
                Err(e) => {
                    error!("Stopping scheduler: {}", e);
                    return Err(e);
                }
            }
        }
    }

    fn finish(&mut self) -> Result<()> {
        if self.failures.is_empty() {
            info!("All threads have been posted. Exiting.");
            return Ok(());
        }

        warn!(
            "{} thread(s) could not be posted and remain in the posts file",
            self.failures.len()
        );
        Err(self.failures.remove(0))
    }
}
