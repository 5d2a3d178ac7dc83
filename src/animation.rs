//! Playback controller for frame sequences.

use std::time::Duration;

use log::{debug, trace, warn};

/// Identity of one armed playback timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// Arms and disarms the repeating timer that drives playback.
///
/// The controller arms at most one timer at a time and always disarms before
/// re-arming. Whoever owns the real clock calls
/// [`PlaybackController::on_timer`] with the armed id on every period.
pub trait TickScheduler {
    /// Start a repeating timer with the given period.
    fn arm(&mut self, period: Duration) -> TimerId;
    /// Stop a timer previously returned by `arm`.
    fn disarm(&mut self, id: TimerId);
}

/// A scheduler with no clock of its own.
///
/// It only records which timers are armed; the host drives playback by
/// reading [`ManualScheduler::armed`] and feeding ticks back.
#[derive(Clone, Debug, Default)]
pub struct ManualScheduler {
    next_id: u64,
    armed: Vec<(TimerId, Duration)>,
    arm_calls: usize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently armed timer and its period.
    pub fn armed(&self) -> Option<(TimerId, Duration)> {
        self.armed.last().copied()
    }

    /// Number of timers armed right now.
    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }

    /// Total number of `arm` calls so far.
    pub fn arm_calls(&self) -> usize {
        self.arm_calls
    }
}

impl TickScheduler for ManualScheduler {
    fn arm(&mut self, period: Duration) -> TimerId {
        self.next_id += 1;
        self.arm_calls += 1;
        let id = TimerId(self.next_id);
        self.armed.push((id, period));
        id
    }

    fn disarm(&mut self, id: TimerId) {
        self.armed.retain(|(armed, _)| *armed != id);
    }
}

/// Snapshot of the playback state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackState {
    pub current_index: usize,
    pub is_playing: bool,
    pub is_looping: bool,
    /// Frames per second
    pub fps: f64,
    /// Playback speed multiplier
    pub speed: f64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_index: 0,
            is_playing: false,
            is_looping: false,
            fps: 12.0,
            speed: 1.0,
        }
    }
}

/// Drives the current index of a frame sequence over time and on user input.
///
/// The controller owns the only copy of the playback state. It never draws;
/// callers read the index after each operation and refresh their display.
///
/// ## Example
///
/// ```rust
/// use spritesheet_core_view::{ManualScheduler, PlaybackController};
///
/// let mut controller = PlaybackController::new(ManualScheduler::new());
/// controller.set_total_frames(4);
///
/// // Start playback
/// controller.play();
/// assert!(controller.is_playing());
///
/// // Feed ticks from the armed timer
/// let (timer, _period) = controller.scheduler().armed().unwrap();
/// for _ in 0..3 {
///     controller.on_timer(timer);
/// }
/// assert_eq!(controller.current_index(), 3);
///
/// // Without looping the next tick pauses at the end
/// controller.on_timer(timer);
/// assert_eq!(controller.current_index(), 3);
/// assert!(!controller.is_playing());
/// ```
#[derive(Debug)]
pub struct PlaybackController<S: TickScheduler> {
    state: PlaybackState,
    /// Length of the active sequence
    total_frames: usize,
    /// Timer armed while playing
    timer: Option<TimerId>,
    /// Progress handle is being dragged
    scrubbing: bool,
    scheduler: S,
}

impl<S: TickScheduler> PlaybackController<S> {
    /// Create an idle controller with default rate (12 fps, 1x).
    pub fn new(scheduler: S) -> Self {
        Self::with_state(PlaybackState::default(), scheduler)
    }

    /// Create an idle controller starting from the rate and loop flag of `state`.
    ///
    /// A rate pair whose period cannot be timed falls back to the defaults.
    pub fn with_state(state: PlaybackState, scheduler: S) -> Self {
        let defaults = PlaybackState::default();
        let mut fps = valid_rate(state.fps).unwrap_or(defaults.fps);
        let mut speed = valid_rate(state.speed).unwrap_or(defaults.speed);
        if timer_period(fps, speed).is_none() {
            fps = defaults.fps;
            speed = defaults.speed;
        }
        Self {
            state: PlaybackState {
                current_index: 0,
                is_playing: false,
                is_looping: state.is_looping,
                fps,
                speed,
            },
            total_frames: 0,
            timer: None,
            scrubbing: false,
            scheduler,
        }
    }

    #[inline]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[inline]
    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    #[inline]
    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    #[inline]
    pub fn is_looping(&self) -> bool {
        self.state.is_looping
    }

    #[inline]
    pub fn is_scrubbing(&self) -> bool {
        self.scrubbing
    }

    /// The timer armed while playing.
    #[inline]
    pub fn timer(&self) -> Option<TimerId> {
        self.timer
    }

    #[inline]
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    #[inline]
    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Period between timer ticks: `(1000 / fps) / speed` milliseconds.
    pub fn period(&self) -> Duration {
        timer_period(self.state.fps, self.state.speed).unwrap_or(Duration::MAX)
    }

    /// Set the length of the active sequence, clamping the current index.
    ///
    /// An empty sequence stops playback.
    pub fn set_total_frames(&mut self, total: usize) {
        self.total_frames = total;
        if total == 0 {
            self.pause();
            self.state.current_index = 0;
        } else if self.state.current_index >= total {
            self.state.current_index = total - 1;
        }
    }

    /// Start playback. No-op with fewer than two frames or when already playing.
    pub fn play(&mut self) {
        if self.total_frames <= 1 || self.state.is_playing {
            return;
        }
        self.state.is_playing = true;
        self.arm();
        debug!("playback started at {:.2} fps x{:.2}", self.state.fps, self.state.speed);
    }

    /// Stop the timer and keep the current index. Idempotent.
    pub fn pause(&mut self) {
        self.disarm();
        self.state.is_playing = false;
    }

    /// Pause and rewind to the first frame.
    pub fn stop(&mut self) {
        self.pause();
        self.state.current_index = 0;
    }

    /// Play when idle, pause when playing.
    pub fn toggle(&mut self) {
        if self.state.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Rewind to the first frame without touching play state.
    pub fn reset(&mut self) {
        self.state.current_index = 0;
    }

    /// Handle a tick from the scheduler.
    ///
    /// Ticks from a timer that is no longer armed are ignored, as are ticks
    /// that arrive while the progress handle is being dragged. Returns `true`
    /// when the state changed.
    pub fn on_timer(&mut self, id: TimerId) -> bool {
        if self.timer != Some(id) {
            trace!("ignoring tick from stale timer {:?}", id);
            return false;
        }
        if self.scrubbing {
            return false;
        }
        self.advance()
    }

    /// Move one frame forward, wrapping when looping, pausing at the end
    /// otherwise. Returns `true` when the state changed.
    pub fn advance(&mut self) -> bool {
        if self.total_frames == 0 {
            return false;
        }
        if self.state.current_index + 1 < self.total_frames {
            self.state.current_index += 1;
            true
        } else if self.state.is_looping {
            trace!("playback loop: {} -> 0", self.state.current_index);
            self.state.current_index = 0;
            true
        } else {
            let was_playing = self.state.is_playing;
            self.pause();
            was_playing
        }
    }

    /// Jump to `index`, clamped to the sequence. Returns `true` when the
    /// sequence is non-empty.
    pub fn seek(&mut self, index: usize) -> bool {
        if self.total_frames == 0 {
            return false;
        }
        self.state.current_index = index.min(self.total_frames - 1);
        true
    }

    /// Update fps and speed. Non-positive or non-finite values keep the
    /// previous value, and a pair whose period is zero or too long for a
    /// timer keeps both. A playing timer is re-armed at the new period.
    pub fn set_rate(&mut self, fps: f64, speed: f64) {
        let fps = valid_rate(fps).unwrap_or(self.state.fps);
        let speed = valid_rate(speed).unwrap_or(self.state.speed);
        if timer_period(fps, speed).is_none() {
            warn!("rejecting playback rate {} fps x{}: period out of range", fps, speed);
            return;
        }
        self.state.fps = fps;
        self.state.speed = speed;
        if self.state.is_playing {
            self.disarm();
            self.arm();
        }
    }

    pub fn set_loop(&mut self, looping: bool) {
        self.state.is_looping = looping;
    }

    /// Enter the transient scrubbing sub-state.
    pub fn begin_scrub(&mut self) {
        self.scrubbing = true;
    }

    pub fn end_scrub(&mut self) {
        self.scrubbing = false;
    }

    fn arm(&mut self) {
        let period = self.period();
        self.timer = Some(self.scheduler.arm(period));
    }

    fn disarm(&mut self) {
        if let Some(id) = self.timer.take() {
            self.scheduler.disarm(id);
        }
    }
}

fn valid_rate(value: f64) -> Option<f64> {
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Timer period for a rate pair, if a timer can run at it.
fn timer_period(fps: f64, speed: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(1.0 / fps / speed)
        .ok()
        .filter(|period| !period.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(total: usize) -> PlaybackController<ManualScheduler> {
        let mut ctrl = PlaybackController::new(ManualScheduler::new());
        ctrl.set_total_frames(total);
        ctrl
    }

    fn tick(ctrl: &mut PlaybackController<ManualScheduler>) -> bool {
        match ctrl.scheduler().armed() {
            Some((id, _)) => ctrl.on_timer(id),
            None => false,
        }
    }

    #[test]
    fn test_basic_playback() {
        let mut ctrl = controller(10);
        assert!(!ctrl.is_playing());
        assert_eq!(ctrl.current_index(), 0);

        ctrl.play();
        assert!(ctrl.is_playing());
        assert_eq!(ctrl.scheduler().armed_count(), 1);

        for _ in 0..5 {
            tick(&mut ctrl);
        }
        assert_eq!(ctrl.current_index(), 5);

        ctrl.pause();
        assert!(!ctrl.is_playing());
        assert_eq!(ctrl.scheduler().armed_count(), 0);
        assert_eq!(ctrl.current_index(), 5);
    }

    #[test]
    fn test_play_needs_two_frames() {
        let mut ctrl = controller(1);
        ctrl.play();
        assert!(!ctrl.is_playing());
        assert_eq!(ctrl.scheduler().arm_calls(), 0);

        let mut empty = controller(0);
        empty.play();
        assert!(!empty.is_playing());
    }

    #[test]
    fn test_loop_wraps_to_start() {
        let mut ctrl = controller(5);
        ctrl.set_loop(true);
        ctrl.seek(4);
        ctrl.play();

        assert!(tick(&mut ctrl));
        assert_eq!(ctrl.current_index(), 0);
        assert!(ctrl.is_playing());
    }

    #[test]
    fn test_end_without_loop_pauses() {
        let mut ctrl = controller(5);
        ctrl.seek(4);
        ctrl.play();

        assert!(tick(&mut ctrl));
        assert_eq!(ctrl.current_index(), 4);
        assert!(!ctrl.is_playing());
        assert_eq!(ctrl.scheduler().armed_count(), 0);
    }

    #[test]
    fn test_stop_rewinds() {
        let mut ctrl = controller(8);
        ctrl.seek(6);
        ctrl.play();
        ctrl.stop();
        assert_eq!(ctrl.current_index(), 0);
        assert!(!ctrl.is_playing());
        assert!(ctrl.timer().is_none());
    }

    #[test]
    fn test_toggle() {
        let mut ctrl = controller(3);
        ctrl.toggle();
        assert!(ctrl.is_playing());
        ctrl.toggle();
        assert!(!ctrl.is_playing());
        ctrl.pause();
        assert!(!ctrl.is_playing());
    }

    #[test]
    fn test_seek_clamps() {
        let mut ctrl = controller(10);
        assert!(ctrl.seek(99));
        assert_eq!(ctrl.current_index(), 9);
        assert!(ctrl.seek(0));
        assert_eq!(ctrl.current_index(), 0);

        let mut empty = controller(0);
        assert!(!empty.seek(3));
        assert_eq!(empty.current_index(), 0);
    }

    #[test]
    fn test_period() {
        let mut ctrl = controller(2);
        assert_eq!(ctrl.period().as_millis(), 83); // 1000/12 ≈ 83.3

        ctrl.set_rate(24.0, 2.0);
        assert_eq!(ctrl.period().as_micros(), 20_833); // (1000/24)/2 ≈ 20.83ms
    }

    #[test]
    fn test_set_rate_rearms_single_timer() {
        let mut ctrl = controller(10);
        ctrl.play();
        let (first, _) = ctrl.scheduler().armed().unwrap();

        ctrl.set_rate(30.0, 1.5);
        assert_eq!(ctrl.scheduler().armed_count(), 1);
        let (second, period) = ctrl.scheduler().armed().unwrap();
        assert_ne!(first, second);
        assert_eq!(period, Duration::from_secs_f64(1.0 / 30.0 / 1.5));

        // The old timer no longer advances playback
        assert!(!ctrl.on_timer(first));
        assert_eq!(ctrl.current_index(), 0);
        assert!(ctrl.on_timer(second));
        assert_eq!(ctrl.current_index(), 1);
    }

    #[test]
    fn test_set_rate_rejects_invalid() {
        let mut ctrl = controller(2);
        ctrl.set_rate(0.0, f64::NAN);
        assert_eq!(ctrl.state().fps, 12.0);
        assert_eq!(ctrl.state().speed, 1.0);
        ctrl.set_rate(-3.0, 0.5);
        assert_eq!(ctrl.state().fps, 12.0);
        assert_eq!(ctrl.state().speed, 0.5);
    }

    #[test]
    fn test_set_rate_rejects_untimeable_periods() {
        let mut ctrl = controller(4);
        ctrl.play();

        // 1e30 seconds per frame does not fit a Duration
        ctrl.set_rate(1e-30, 1.0);
        assert_eq!(ctrl.state().fps, 12.0);
        // Rounds down to a zero period
        ctrl.set_rate(1e300, 1e300);
        assert_eq!(ctrl.state().speed, 1.0);

        assert_eq!(ctrl.period().as_millis(), 83);
        assert_eq!(ctrl.scheduler().arm_calls(), 1);
        assert!(tick(&mut ctrl));
    }

    #[test]
    fn test_with_state_untimeable_rate_uses_defaults() {
        let state = PlaybackState {
            fps: 1e-300,
            speed: 1e-10,
            is_looping: true,
            ..PlaybackState::default()
        };
        let ctrl = PlaybackController::with_state(state, ManualScheduler::new());
        assert_eq!((ctrl.state().fps, ctrl.state().speed), (12.0, 1.0));
        assert!(ctrl.is_looping());
    }

    #[test]
    fn test_set_rate_when_idle_arms_nothing() {
        let mut ctrl = controller(4);
        ctrl.set_rate(60.0, 1.0);
        assert_eq!(ctrl.scheduler().arm_calls(), 0);
    }

    #[test]
    fn test_scrub_suspends_ticks() {
        let mut ctrl = controller(10);
        ctrl.play();
        ctrl.begin_scrub();
        ctrl.seek(7);
        assert!(!tick(&mut ctrl));
        assert_eq!(ctrl.current_index(), 7);
        ctrl.end_scrub();
        assert!(tick(&mut ctrl));
        assert_eq!(ctrl.current_index(), 8);
    }

    #[test]
    fn test_shrinking_sequence_clamps_index() {
        let mut ctrl = controller(10);
        ctrl.seek(9);
        ctrl.set_total_frames(4);
        assert_eq!(ctrl.current_index(), 3);

        ctrl.play();
        ctrl.set_total_frames(0);
        assert!(!ctrl.is_playing());
        assert_eq!(ctrl.current_index(), 0);
    }

    #[test]
    fn test_index_stays_in_range() {
        let mut ctrl = controller(6);
        // Deterministic pseudo-random walk over the public operations
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for step in 0..2_000 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            match seed % 7 {
                0 => ctrl.play(),
                1 => ctrl.pause(),
                2 => {
                    ctrl.advance();
                }
                3 => {
                    ctrl.seek((seed >> 8) as usize % 20);
                }
                4 => {
                    tick(&mut ctrl);
                }
                5 => ctrl.set_loop(step % 2 == 0),
                _ => ctrl.set_total_frames(1 + (seed >> 16) as usize % 8),
            }
            assert!(ctrl.current_index() < ctrl.total_frames());
            assert!(ctrl.scheduler().armed_count() <= 1);
        }
    }
}
