// THEORY:
// `ParallelSession` keeps the frame loop on the caller's thread and moves
// classification onto a pool of tokio workers, so a slow classification never
// makes the capture loop drop frames.
//
// Tracking and segmentation stay sequential: they are cheap, and the
// segmenter's state machine needs every frame in order. When a gesture
// completes, its trace is tagged with a sequence number and handed to a
// dispatcher that deals tasks round-robin to the workers. Workers may finish
// out of order; a collector task holds early results in a pending map and
// releases them strictly by sequence number. Spells therefore come out in the
// order their gestures ended, whatever the worker timing.
//
// Shutting down closes the task channel. Workers drain what they already have,
// the collector flushes the rest in order, and `shutdown` returns whatever the
// caller had not yet read.

use crate::config::SpellcasterConfig;
use crate::core_modules::classifier::RecognitionResult;
use crate::core_modules::frame::Frame;
use crate::core_modules::model::SpellModel;
use crate::core_modules::segmenter::{GestureSegmenter, Phase, SegmentEvent};
use crate::core_modules::spot_tracker::SpotTracker;
use crate::core_modules::trace::{CandidatePoint, GestureTrace};
use crate::error::{ClassifyError, FrameError, FrameFault, SessionError};
use crate::pipeline::Recognizer;
use futures::Stream;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const MAX_DEFAULT_WORKERS: usize = 4;

/// The classification of one completed gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// Position of the gesture in completion order, starting at 0.
    pub sequence: u64,
    pub outcome: Result<RecognitionResult, ClassifyError>,
}

struct RecognitionTask {
    sequence: u64,
    trace: GestureTrace,
}

struct WorkerPool {
    task_sender: mpsc::UnboundedSender<RecognitionTask>,
    dispatcher: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
    collector: JoinHandle<()>,
}

impl WorkerPool {
    /// Spawns the dispatcher, `size` workers and the collector. Must be called
    /// from within a tokio runtime.
    fn new(recognizer: Arc<Recognizer>, size: usize, output: mpsc::UnboundedSender<Verdict>) -> Self {
        let size = size.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<RecognitionTask>();
        let (result_sender, mut result_receiver) = mpsc::unbounded_channel::<Verdict>();

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..size)
            .map(|_| mpsc::unbounded_channel::<RecognitionTask>())
            .unzip();

        // --- 1. Dispatcher ---
        let dispatcher = tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                if worker_senders[worker_idx].send(task).is_err() {
                    warn!(worker = worker_idx, "recognition worker gone");
                }
                worker_idx = (worker_idx + 1) % worker_senders.len();
            }
        });

        // --- 2. Workers ---
        let workers = worker_receivers
            .into_iter()
            .map(|mut worker_receiver| {
                let recognizer = Arc::clone(&recognizer);
                let results = result_sender.clone();
                tokio::spawn(async move {
                    while let Some(task) = worker_receiver.recv().await {
                        let outcome = recognizer.recognize(&task.trace);
                        let _ = results.send(Verdict {
                            sequence: task.sequence,
                            outcome,
                        });
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();
        drop(result_sender);

        // --- 3. Collector ---
        let collector = tokio::spawn(async move {
            let mut pending: BTreeMap<u64, Verdict> = BTreeMap::new();
            let mut next_expected = 0u64;
            while let Some(verdict) = result_receiver.recv().await {
                pending.insert(verdict.sequence, verdict);
                while let Some(ready) = pending.remove(&next_expected) {
                    next_expected += 1;
                    if output.send(ready).is_err() {
                        return;
                    }
                }
            }
            if !pending.is_empty() {
                warn!(stranded = pending.len(), "verdicts left without predecessors");
            }
        });

        Self {
            task_sender,
            dispatcher,
            workers,
            collector,
        }
    }

    fn submit(&self, task: RecognitionTask) -> bool {
        self.task_sender.send(task).is_ok()
    }

    async fn join(self) {
        let Self {
            task_sender,
            dispatcher,
            workers,
            collector,
        } = self;
        drop(task_sender);
        let _ = dispatcher.await;
        for worker in workers {
            let _ = worker.await;
        }
        let _ = collector.await;
    }
}

/// What the frame loop observed for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameStatus {
    Idle,
    Tracking { phase: Phase, trace_len: usize },
    /// A gesture ended and was queued under this sequence number.
    Queued(u64),
    Discarded,
}

pub struct ParallelSession {
    config: Arc<SpellcasterConfig>,
    tracker: SpotTracker,
    segmenter: GestureSegmenter,
    pool: WorkerPool,
    verdicts: mpsc::UnboundedReceiver<Verdict>,
    next_sequence: u64,
}

impl ParallelSession {
    /// Builds a session with one worker per CPU, capped at a small pool.
    /// Must be called from within a tokio runtime.
    pub fn new(config: SpellcasterConfig, model: SpellModel) -> Result<Self, SessionError> {
        let workers = num_cpus::get().clamp(1, MAX_DEFAULT_WORKERS);
        Self::with_workers(config, model, workers)
    }

    pub fn with_workers(config: SpellcasterConfig, model: SpellModel, workers: usize) -> Result<Self, SessionError> {
        config.validate()?;
        let tracker = SpotTracker::new(config.tracker_config())?;
        let segmenter = GestureSegmenter::new(config.segmenter_config())?;
        let recognizer = Arc::new(Recognizer::new(model, &config)?);
        let (output, verdicts) = mpsc::unbounded_channel();
        let pool = WorkerPool::new(recognizer, workers, output);
        info!(workers = workers.max(1), "parallel recognition session ready");
        Ok(Self {
            config: Arc::new(config),
            tracker,
            segmenter,
            pool,
            verdicts,
            next_sequence: 0,
        })
    }

    pub fn config(&self) -> &SpellcasterConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.segmenter.phase()
    }

    /// Gestures queued so far.
    pub fn queued(&self) -> u64 {
        self.next_sequence
    }

    pub fn push_frame(&mut self, frame: &Frame) -> Result<FrameStatus, FrameFault> {
        let expected = self.config.resolution();
        if frame.dimensions() != expected {
            let fault = FrameError::ShapeMismatch {
                expected,
                found: frame.dimensions(),
            };
            warn!(error = %fault, timestamp_ms = frame.timestamp_ms(), "frame dropped");
            return Err(fault.into());
        }
        let candidate = self.tracker.detect(frame);
        Ok(self.push_candidate(candidate))
    }

    pub fn push_candidate(&mut self, candidate: Option<CandidatePoint>) -> FrameStatus {
        match self.segmenter.step(candidate) {
            SegmentEvent::Nothing => FrameStatus::Idle,
            SegmentEvent::Discarded(_) => FrameStatus::Discarded,
            SegmentEvent::Completed(trace) => {
                let sequence = self.next_sequence;
                self.next_sequence += 1;
                debug!(sequence, points = trace.len(), "gesture queued for classification");
                if !self.pool.submit(RecognitionTask { sequence, trace }) {
                    warn!(sequence, "recognition pool closed, gesture lost");
                }
                FrameStatus::Queued(sequence)
            }
            _ => FrameStatus::Tracking {
                phase: self.segmenter.phase(),
                trace_len: self.segmenter.trace_len(),
            },
        }
    }

    /// Waits for the next verdict in completion order. `None` once the pool
    /// has shut down and everything was delivered.
    pub async fn next_verdict(&mut self) -> Option<Verdict> {
        self.verdicts.recv().await
    }

    /// Verdicts already available, without waiting.
    pub fn try_next_verdict(&mut self) -> Option<Verdict> {
        self.verdicts.try_recv().ok()
    }

    /// The verdicts as an ordered stream.
    pub fn verdicts(&mut self) -> impl Stream<Item = Verdict> + '_ {
        futures::stream::unfold(&mut self.verdicts, |rx| async move {
            let verdict = rx.recv().await?;
            Some((verdict, rx))
        })
    }

    /// Drops the gesture in progress. Gestures already queued still complete.
    pub fn reset(&mut self) {
        let dropped = self.segmenter.reset();
        self.tracker.forget();
        info!(dropped_points = dropped, "parallel session reset");
    }

    /// Finishes queued work and returns every verdict not yet read, in order.
    pub async fn shutdown(self) -> Vec<Verdict> {
        let Self { pool, mut verdicts, .. } = self;
        pool.join().await;
        let mut remaining = Vec::new();
        while let Some(verdict) = verdicts.recv().await {
            remaining.push(verdict);
        }
        remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::templates::standard_model;

    #[tokio::test]
    async fn discarded_gestures_are_never_queued() {
        let mut session =
            ParallelSession::with_workers(SpellcasterConfig::defaults(), standard_model().unwrap(), 2).unwrap();
        for i in 0..3 {
            session.push_candidate(Some(CandidatePoint::new(100.0 + i as f64, 100.0, 255.0, i)));
        }
        let statuses: Vec<_> = (0..15).map(|_| session.push_candidate(None)).collect();
        assert_eq!(statuses.last(), Some(&FrameStatus::Discarded));
        assert_eq!(session.queued(), 0);
        assert!(session.shutdown().await.is_empty());
    }
}
