use std::cell::Cell;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// Input the game loop reacts to
#[derive(Clone, Debug, PartialEq)]
pub enum TermEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// One loop iteration: what happened and the game time it happened at
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub at: Duration,
    pub event: TermEvent,
}

/// Maps a raw terminal event to game input. Key releases are dropped, so terminals
/// that report them do not type every character twice.
pub fn translate(event: CtEvent) -> Option<TermEvent> {
    match event {
        CtEvent::Key(key) if key.kind != KeyEventKind::Release => Some(TermEvent::Key(key)),
        CtEvent::Resize(_, _) => Some(TermEvent::Resize),
        _ => None,
    }
}

pub trait EventSource {
    /// Waits up to `timeout` for the next input
    fn recv_timeout(&self, timeout: Duration) -> Result<TermEvent, RecvTimeoutError>;
}

/// Game input delivered over a channel, either from the terminal reader thread or
/// from a test feeding events by hand
pub struct ChannelEventSource {
    rx: Receiver<TermEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<TermEvent>) -> Self {
        Self { rx }
    }

    /// Reads crossterm events on a background thread until the loop goes away
    pub fn crossterm() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(raw) => {
                    if let Some(ev) = translate(raw) {
                        if tx.send(ev).is_err() {
                            break;
                        }
                    }
                }
                Err(e) => {
                    log::error!("terminal event read failed: {e}");
                    break;
                }
            }
        });

        Self { rx }
    }
}

impl EventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TermEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Monotonic time handed to the engines, measured from an arbitrary epoch
pub trait Clock {
    fn now(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// Hand-advanced clock for headless runs
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.lock().map(|now| *now).unwrap_or_default()
    }
}

/// Drives the game loop: interleaves input with ticks every `tick_rate` of game time
/// and stamps each step with the clock.
pub struct Runner<E: EventSource, C: Clock> {
    events: E,
    clock: C,
    tick_rate: Duration,
    next_tick: Cell<Duration>,
}

impl<E: EventSource, C: Clock> Runner<E, C> {
    pub fn new(events: E, clock: C, tick_rate: Duration) -> Self {
        let next_tick = Cell::new(clock.now() + tick_rate);
        Self {
            events,
            clock,
            tick_rate,
            next_tick,
        }
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Returns the next input, or a tick once the tick deadline has passed.
    /// An overdue tick goes ahead of pending input, so steady typing cannot stall the timers.
    pub fn step(&self) -> Step {
        let now = self.clock.now();
        let due = self.next_tick.get();

        if now < due {
            match self.events.recv_timeout(due - now) {
                Ok(event) => {
                    return Step {
                        at: self.clock.now(),
                        event,
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                // input is gone for good; keep ticking at the normal pace
                Err(RecvTimeoutError::Disconnected) => std::thread::sleep(due - now),
            }
        }

        let at = self.clock.now();
        self.next_tick.set(at + self.tick_rate);
        Step {
            at,
            event: TermEvent::Tick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEventState, KeyModifiers};

    fn key(c: char) -> TermEvent {
        TermEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    fn runner(
        tick_rate: Duration,
    ) -> (
        mpsc::Sender<TermEvent>,
        ManualClock,
        Runner<ChannelEventSource, ManualClock>,
    ) {
        let (tx, rx) = mpsc::channel();
        let clock = ManualClock::new();
        let runner = Runner::new(ChannelEventSource::new(rx), clock.clone(), tick_rate);
        (tx, clock, runner)
    }

    #[test]
    fn translate_drops_key_releases() {
        let press = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        let release = KeyEvent {
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
            ..press
        };

        assert_eq!(translate(CtEvent::Key(press)), Some(TermEvent::Key(press)));
        assert_eq!(translate(CtEvent::Key(release)), None);
        assert_eq!(translate(CtEvent::Resize(80, 24)), Some(TermEvent::Resize));
        assert_eq!(translate(CtEvent::FocusGained), None);
    }

    #[test]
    fn idle_input_yields_tick_at_clock_time() {
        let (_tx, _clock, runner) = runner(Duration::from_millis(1));
        assert_eq!(
            runner.step(),
            Step {
                at: Duration::ZERO,
                event: TermEvent::Tick,
            }
        );
    }

    #[test]
    fn input_before_deadline_is_stamped_with_clock_time() {
        let (tx, clock, runner) = runner(Duration::from_secs(10));
        clock.advance(Duration::from_millis(300));
        tx.send(key('x')).unwrap();

        let step = runner.step();
        assert_eq!(step.event, key('x'));
        assert_eq!(step.at, Duration::from_millis(300));
    }

    #[test]
    fn overdue_tick_goes_ahead_of_pending_input() {
        let (tx, clock, runner) = runner(Duration::from_millis(100));
        for c in "abc".chars() {
            tx.send(key(c)).unwrap();
        }

        assert_eq!(runner.step().event, key('a'));

        clock.advance(Duration::from_millis(100));
        let tick = runner.step();
        assert_eq!(tick.event, TermEvent::Tick);
        assert_eq!(tick.at, Duration::from_millis(100));

        // next deadline is a full tick away again
        assert_eq!(runner.step().event, key('b'));
        assert_eq!(runner.step().event, key('c'));
    }

    #[test]
    fn closed_input_still_ticks() {
        let (tx, _clock, runner) = runner(Duration::from_millis(1));
        drop(tx);
        assert_eq!(runner.step().event, TermEvent::Tick);
        assert_eq!(runner.step().event, TermEvent::Tick);
    }

    #[test]
    fn manual_clock_advances_shared_time() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.advance(Duration::from_millis(250));
        handle.advance(Duration::from_millis(250));
        assert_eq!(clock.now(), Duration::from_millis(500));
    }

    #[test]
    fn monotonic_clock_never_goes_back() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
