//! Ordered audio playback queue
//!
//! Serializes playback of decoded buffers: FIFO order, at most one buffer
//! rendering at a time, automatic advancement on completion. The queue is
//! owned by the session and outlives individual requests — cancelling a
//! request leaves queued audio alone unless [`PlaybackQueue::stop_all`] is
//! called explicitly (barge-in).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

use super::decode::DecodedAudio;

/// Delay between a buffer's completion and starting the next one, to avoid
/// tight-loop races on the underlying audio backend
const REARM_DELAY: Duration = Duration::from_millis(100);

/// Renders one decoded buffer to an output device
///
/// `render` resolves when the buffer has finished playing (or was halted).
/// Implementations: the cpal speaker renderer, an avatar device, test fakes.
#[async_trait]
pub trait AudioRenderer: Send + Sync {
    /// Play one buffer to completion
    async fn render(&self, audio: DecodedAudio) -> Result<()>;

    /// Stop any in-flight rendering immediately
    fn halt(&self);
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<DecodedAudio>,
    playing: bool,
    /// Bumped by `stop_all` so a halted render's completion can't corrupt
    /// the state of the next playback cycle
    epoch: u64,
}

/// FIFO playback queue with a single renderer slot
pub struct PlaybackQueue {
    state: Mutex<QueueState>,
    renderer: Arc<dyn AudioRenderer>,
    /// Self-handle for the tasks spawned on completion
    this: Weak<Self>,
}

impl PlaybackQueue {
    /// Create a queue driving `renderer`
    #[must_use]
    pub fn new(renderer: Arc<dyn AudioRenderer>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            state: Mutex::new(QueueState::default()),
            renderer,
            this: this.clone(),
        })
    }

    /// Append a buffer; starts playback immediately when idle
    pub fn push(&self, audio: DecodedAudio) {
        let idle = {
            let mut state = self.state.lock().expect("queue lock");
            state.pending.push_back(audio);
            !state.playing
        };
        tracing::debug!(idle, "audio buffer queued");
        if idle {
            self.try_play_next();
        }
    }

    /// Start the next pending buffer if nothing is playing
    ///
    /// Returns `true` if a buffer was started. Calling while a buffer is
    /// already rendering is a no-op.
    pub fn try_play_next(&self) -> bool {
        let (audio, epoch) = {
            let mut state = self.state.lock().expect("queue lock");
            if state.playing {
                return false;
            }
            let Some(audio) = state.pending.pop_front() else {
                return false;
            };
            state.playing = true;
            (audio, state.epoch)
        };

        // The upgrade always succeeds while a caller holds the queue alive.
        let Some(queue) = self.this.upgrade() else {
            return false;
        };
        tokio::spawn(async move {
            if let Err(e) = queue.renderer.render(audio).await {
                tracing::warn!(error = %e, "audio render failed");
            }
            queue.on_render_complete(epoch);
        });
        true
    }

    /// Completion callback: release the renderer slot and re-arm
    fn on_render_complete(&self, epoch: u64) {
        let rearm = {
            let mut state = self.state.lock().expect("queue lock");
            if state.epoch != epoch {
                // stop_all ran while this buffer rendered; its state is gone.
                return;
            }
            state.playing = false;
            !state.pending.is_empty()
        };

        if rearm {
            if let Some(queue) = self.this.upgrade() {
                tokio::spawn(async move {
                    tokio::time::sleep(REARM_DELAY).await;
                    queue.try_play_next();
                });
            }
        }
    }

    /// Clear pending buffers and stop any in-flight rendering (barge-in)
    pub fn stop_all(&self) {
        {
            let mut state = self.state.lock().expect("queue lock");
            state.pending.clear();
            state.playing = false;
            state.epoch += 1;
        }
        self.renderer.halt();
        tracing::debug!("playback stopped and queue cleared");
    }

    /// Whether a buffer is currently rendering
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state.lock().expect("queue lock").playing
    }

    /// Number of buffers waiting behind the current one
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.state.lock().expect("queue lock").pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Renderer that holds each buffer until the test releases it
    struct GatedRenderer {
        started: AtomicUsize,
        finished: AtomicUsize,
        gate: Notify,
        order: Mutex<Vec<u32>>,
    }

    impl GatedRenderer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                started: AtomicUsize::new(0),
                finished: AtomicUsize::new(0),
                gate: Notify::new(),
                order: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl AudioRenderer for GatedRenderer {
        async fn render(&self, audio: DecodedAudio) -> Result<()> {
            self.started.fetch_add(1, Ordering::SeqCst);
            self.order.lock().unwrap().push(audio.sample_rate);
            self.gate.notified().await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn halt(&self) {
            self.gate.notify_waiters();
        }
    }

    fn buffer(tag: u32) -> DecodedAudio {
        DecodedAudio {
            samples: vec![0.0; 16],
            sample_rate: tag,
        }
    }

    async fn settle() {
        // Let spawned render tasks reach their gate.
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn push_while_idle_starts_playback() {
        let renderer = GatedRenderer::new();
        let queue = PlaybackQueue::new(renderer.clone());

        queue.push(buffer(1));
        settle().await;

        assert!(queue.is_playing());
        assert_eq!(renderer.started.load(Ordering::SeqCst), 1);
        assert_eq!(queue.pending_len(), 0);
    }

    #[tokio::test]
    async fn second_push_waits_for_completion() {
        let renderer = GatedRenderer::new();
        let queue = PlaybackQueue::new(renderer.clone());

        queue.push(buffer(1));
        settle().await;
        queue.push(buffer(2));
        settle().await;

        // B stays pending while A renders.
        assert_eq!(renderer.started.load(Ordering::SeqCst), 1);
        assert_eq!(queue.pending_len(), 1);

        // A completes; after the re-arm delay B starts.
        renderer.gate.notify_one();
        tokio::time::sleep(REARM_DELAY + Duration::from_millis(50)).await;

        assert_eq!(renderer.started.load(Ordering::SeqCst), 2);
        assert_eq!(*renderer.order.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn try_play_next_is_idempotent_while_playing() {
        let renderer = GatedRenderer::new();
        let queue = PlaybackQueue::new(renderer.clone());

        queue.push(buffer(1));
        settle().await;
        queue.push(buffer(2));

        assert!(!queue.try_play_next());
        assert!(!queue.try_play_next());
        settle().await;

        // Still only the first buffer rendering, second still pending.
        assert_eq!(renderer.started.load(Ordering::SeqCst), 1);
        assert_eq!(queue.pending_len(), 1);
    }

    #[tokio::test]
    async fn try_play_next_on_empty_queue_is_a_noop() {
        let renderer = GatedRenderer::new();
        let queue = PlaybackQueue::new(renderer);
        assert!(!queue.try_play_next());
        assert!(!queue.is_playing());
    }

    #[tokio::test]
    async fn buffers_play_in_push_order() {
        let renderer = GatedRenderer::new();
        let queue = PlaybackQueue::new(renderer.clone());

        for tag in 1..=3 {
            queue.push(buffer(tag));
        }
        settle().await;

        for _ in 0..3 {
            renderer.gate.notify_one();
            tokio::time::sleep(REARM_DELAY + Duration::from_millis(50)).await;
        }

        assert_eq!(*renderer.order.lock().unwrap(), vec![1, 2, 3]);
        assert!(!queue.is_playing());
        assert_eq!(queue.pending_len(), 0);
    }

    #[tokio::test]
    async fn stop_all_clears_and_halts() {
        let renderer = GatedRenderer::new();
        let queue = PlaybackQueue::new(renderer.clone());

        queue.push(buffer(1));
        settle().await;
        queue.push(buffer(2));
        queue.push(buffer(3));

        queue.stop_all();
        settle().await;

        assert!(!queue.is_playing());
        assert_eq!(queue.pending_len(), 0);
        // The halted render's completion must not restart playback.
        tokio::time::sleep(REARM_DELAY + Duration::from_millis(50)).await;
        assert_eq!(renderer.started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn push_after_stop_all_starts_fresh() {
        let renderer = GatedRenderer::new();
        let queue = PlaybackQueue::new(renderer.clone());

        queue.push(buffer(1));
        settle().await;
        queue.stop_all();
        settle().await;

        queue.push(buffer(2));
        settle().await;

        assert!(queue.is_playing());
        assert_eq!(renderer.started.load(Ordering::SeqCst), 2);
        assert_eq!(renderer.order.lock().unwrap().last(), Some(&2));
    }
}
