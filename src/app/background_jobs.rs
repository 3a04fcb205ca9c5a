use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::domain::{
    ImageServiceError, ReferenceImage, ReferenceImageError, StanzaId, StoryboardError,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum JobOutcome {
    Generation {
        stanza_id: StanzaId,
        ticket: u64,
        result: Result<String, ImageServiceError>,
    },
    ReferenceDecoded {
        path: PathBuf,
        result: Result<ReferenceImage, ReferenceImageError>,
    },
    KeySelection {
        confirmed: Option<bool>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct JobCompletion {
    pub job_id: u64,
    pub outcome: JobOutcome,
}

/// Runs each task on its own thread and queues the outcomes until the owner
/// drains them. There is no concurrency cap and no cancellation. Dropping the
/// runner detaches tasks still in flight; their outcomes land in a queue
/// nobody reads.
pub(crate) struct BackgroundJobs {
    next_job_id: AtomicU64,
    completed: Arc<Mutex<VecDeque<JobCompletion>>>,
    handles: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl BackgroundJobs {
    pub fn new() -> Self {
        Self {
            next_job_id: AtomicU64::new(1),
            completed: Arc::new(Mutex::new(VecDeque::new())),
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn spawn<F>(&self, label: &str, task: F) -> Result<u64, StoryboardError>
    where
        F: FnOnce() -> JobOutcome + Send + 'static,
    {
        let job_id = self.next_job_id.fetch_add(1, Ordering::SeqCst);
        let completed = Arc::clone(&self.completed);

        let handle = thread::Builder::new()
            .name(format!("storyboard-{label}-{job_id}"))
            .spawn(move || {
                let outcome = task();
                completed
                    .lock()
                    .expect("background job queue lock poisoned")
                    .push_back(JobCompletion { job_id, outcome });
            })
            .map_err(|error| {
                StoryboardError::internal(format!(
                    "failed to start background {label} job: {error}"
                ))
            })?;

        let mut handles = self
            .handles
            .lock()
            .expect("background job handles lock poisoned");
        reap_finished(&mut handles);
        handles.push(handle);
        Ok(job_id)
    }

    pub fn drain(&self) -> Vec<JobCompletion> {
        self.completed
            .lock()
            .expect("background job queue lock poisoned")
            .drain(..)
            .collect()
    }

    pub fn running(&self) -> usize {
        self.handles
            .lock()
            .expect("background job handles lock poisoned")
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// True while any task is still running or an outcome awaits draining.
    pub fn has_pending_work(&self) -> bool {
        // A finished thread has already queued its outcome, so check threads
        // before the queue.
        self.running() > 0
            || !self
                .completed
                .lock()
                .expect("background job queue lock poisoned")
                .is_empty()
    }
}

fn reap_finished(handles: &mut Vec<thread::JoinHandle<()>>) {
    let mut index = 0;
    while index < handles.len() {
        if handles[index].is_finished() {
            let _ = handles.swap_remove(index).join();
        } else {
            index += 1;
        }
    }
}
