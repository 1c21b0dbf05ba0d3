//! Countdown for the currently open tile
//!
//! A game has at most one running countdown. It is armed when a tile is
//! opened, re-armed with a fresh full duration after every accepted guess
//! or reveal, replaced by a steal countdown when the steal phase begins and
//! retired when the tile resolves. Expiry is detected by polling the
//! stored deadline; each armed countdown expires at most once.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use web_time::SystemTime;

use crate::teams::Team;

/// Round phase a countdown belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerPhase {
    /// The opening team's guessing phase
    Main,
    /// The opposing team's single steal attempt
    Steal,
}

/// A single countdown towards an absolute deadline
#[serde_with::serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timer {
    /// Phase this countdown belongs to
    phase: TimerPhase,
    /// Team expected to act before the deadline
    owner: Team,
    /// Full length of the countdown
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    duration: Duration,
    /// Moment the countdown expires
    deadline: SystemTime,
    /// Cleared once the expiry has been reported
    running: bool,
    /// Last whole-second value reported to listeners
    #[serde(skip)]
    announced: Option<u64>,
}

impl Timer {
    fn new(phase: TimerPhase, owner: Team, duration: Duration, now: SystemTime) -> Self {
        Self {
            phase,
            owner,
            duration,
            deadline: now + duration,
            running: true,
            announced: None,
        }
    }

    /// Phase of the countdown
    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    /// Team the countdown runs for
    pub fn owner(&self) -> Team {
        self.owner
    }

    /// Full duration the countdown was armed with
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Whether the countdown has not yet reported its expiry
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Time left until the deadline, zero once passed
    pub fn remaining(&self, now: SystemTime) -> Duration {
        self.deadline.duration_since(now).unwrap_or_default()
    }

    /// Whole seconds left for display, rounded up
    pub fn remaining_secs(&self, now: SystemTime) -> u64 {
        self.remaining(now).as_millis().div_ceil(1000) as u64
    }

    /// Whether the deadline has been reached
    pub fn is_expired(&self, now: SystemTime) -> bool {
        now >= self.deadline
    }
}

/// Result of evaluating the active countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The displayed number of seconds changed
    Countdown {
        /// Phase of the countdown
        phase: TimerPhase,
        /// Team the countdown runs for
        owner: Team,
        /// Whole seconds remaining
        remaining: u64,
    },
    /// The deadline passed without the countdown being re-armed
    Expired {
        /// Phase of the countdown
        phase: TimerPhase,
        /// Team the countdown ran for
        owner: Team,
    },
}

/// Owner of the single countdown of a game session
#[serde_with::serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scheduler {
    /// Duration of a main phase countdown
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    main_duration: Duration,
    /// Duration of a steal phase countdown
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    steal_duration: Duration,
    /// The active countdown, if a tile is open
    active: Option<Timer>,
}

impl Scheduler {
    /// Creates a scheduler with no active countdown
    pub fn new(main_duration: Duration, steal_duration: Duration) -> Self {
        Self {
            main_duration,
            steal_duration,
            active: None,
        }
    }

    fn duration_for(&self, phase: TimerPhase) -> Duration {
        match phase {
            TimerPhase::Main => self.main_duration,
            TimerPhase::Steal => self.steal_duration,
        }
    }

    /// Installs a fresh countdown, replacing any previous one
    pub fn arm(&mut self, phase: TimerPhase, owner: Team, now: SystemTime) {
        self.active = Some(Timer::new(phase, owner, self.duration_for(phase), now));
    }

    /// Restarts the active countdown with its full duration
    ///
    /// Phase and owner are kept. Does nothing without an active countdown.
    pub fn reset(&mut self, now: SystemTime) {
        if let Some(timer) = &self.active {
            let (phase, owner) = (timer.phase, timer.owner);
            self.arm(phase, owner, now);
        }
    }

    /// Drops the active countdown
    pub fn retire(&mut self) {
        self.active = None;
    }

    /// Gets the active countdown
    pub fn active(&self) -> Option<&Timer> {
        self.active.as_ref()
    }

    /// Evaluates the active countdown against the current time
    ///
    /// Returns [`Tick::Expired`] exactly once per armed countdown, and
    /// [`Tick::Countdown`] whenever the displayed seconds change.
    pub fn poll(&mut self, now: SystemTime) -> Option<Tick> {
        let timer = self.active.as_mut().filter(|timer| timer.running)?;

        if timer.is_expired(now) {
            timer.running = false;
            return Some(Tick::Expired {
                phase: timer.phase,
                owner: timer.owner,
            });
        }

        let remaining = timer.remaining_secs(now);
        if timer.announced == Some(remaining) {
            return None;
        }
        timer.announced = Some(remaining);

        Some(Tick::Countdown {
            phase: timer.phase,
            owner: timer.owner,
            remaining,
        })
    }
}
