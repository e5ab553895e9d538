//! Scripted body rotation.
//!
//! Before picking, the robot turns in place so the sensor sweeps the side
//! tables into the obstacle map. The script is a list of expected world
//! joint angles, each paired with the next command to send once that angle
//! is confirmed:
//!
//! ```text
//! expected:  0      π/2    -π/2    0
//! next:      π/2    -π/2   0       (done)
//!
//! confirm 0 ──► command π/2 ──► confirm π/2 ──► command -π/2 ──► ...
//!                                          ... confirm 0 ──► Finished
//! ```
//!
//! The machine only moves forward. After `Finished` every joint state is
//! ignored and [`TurnSignal`] releases whoever waits on it.

use std::f64::consts::FRAC_PI_2;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{DrishtiError, Result};

/// Config-file marker for "no further move".
pub const TURN_SENTINEL: f64 = -100.0;

/// Maximum distance between a measured and an expected angle (radians).
pub const ANGLE_TOLERANCE: f64 = 1e-4;

/// Expected angles paired with the follow-up command.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnSequence {
    expected: Vec<f64>,
    next: Vec<Option<f64>>,
}

impl TurnSequence {
    /// Validate a script.
    ///
    /// Both lists must be non-empty and of equal length, and the only
    /// terminal step must be the last one.
    pub fn new(expected: Vec<f64>, next: Vec<Option<f64>>) -> Result<Self> {
        if expected.is_empty() {
            return Err(DrishtiError::Config("turn sequence is empty".to_string()));
        }
        if expected.len() != next.len() {
            return Err(DrishtiError::Config(format!(
                "turn sequence has {} expected angles but {} moves",
                expected.len(),
                next.len()
            )));
        }
        let terminals = next.iter().filter(|m| m.is_none()).count();
        if terminals != 1 || next.last().is_some_and(Option::is_some) {
            return Err(DrishtiError::Config(
                "turn sequence needs exactly one terminal move, in last position".to_string(),
            ));
        }
        if expected.iter().chain(next.iter().flatten()).any(|a| !a.is_finite()) {
            return Err(DrishtiError::Config("turn sequence angles must be finite".to_string()));
        }
        Ok(Self { expected, next })
    }

    /// Build from config lists where [`TURN_SENTINEL`] marks the end.
    pub fn from_markers(expected: Vec<f64>, next: Vec<f64>) -> Result<Self> {
        let next = next
            .into_iter()
            .map(|a| ((a - TURN_SENTINEL).abs() > f64::EPSILON).then_some(a))
            .collect();
        Self::new(expected, next)
    }

    /// Left, right, back to center.
    pub fn pr2_default() -> Self {
        Self {
            expected: vec![0.0, FRAC_PI_2, -FRAC_PI_2, 0.0],
            next: vec![Some(FRAC_PI_2), Some(-FRAC_PI_2), Some(0.0), None],
        }
    }

    pub fn len(&self) -> usize {
        self.expected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expected.is_empty()
    }

    pub fn expected(&self) -> &[f64] {
        &self.expected
    }
}

impl Default for TurnSequence {
    fn default() -> Self {
        Self::pr2_default()
    }
}

/// Outcome of one joint state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TurnEvent {
    /// Angle did not match, or the turn is already over.
    Ignored,
    /// Angle confirmed; publish this command.
    Command(f64),
    /// Last angle confirmed; stop listening to joint states.
    Finished,
}

/// Snapshot of the machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnState {
    pub expected_index: usize,
    pub current_target_angle: f64,
    pub done: bool,
}

/// Advances through a [`TurnSequence`] on matching joint angles.
#[derive(Debug, Clone)]
pub struct TurnStateMachine {
    sequence: TurnSequence,
    expected_index: usize,
    done: bool,
    tolerance: f64,
}

impl TurnStateMachine {
    pub fn new(sequence: TurnSequence) -> Self {
        Self {
            sequence,
            expected_index: 0,
            done: false,
            tolerance: ANGLE_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Feed the measured world joint angle.
    pub fn on_joint_state(&mut self, angle: f64) -> TurnEvent {
        if self.done {
            return TurnEvent::Ignored;
        }
        let target = self.sequence.expected[self.expected_index];
        let confirmed = (angle - target).abs() < self.tolerance;
        if !confirmed {
            return TurnEvent::Ignored;
        }

        match self.sequence.next[self.expected_index] {
            Some(command) => {
                log::info!(
                    "Turn step {} confirmed at {:.4} rad, commanding {:.4} rad",
                    self.expected_index,
                    angle,
                    command
                );
                self.expected_index += 1;
                TurnEvent::Command(command)
            }
            None => {
                log::info!("Turn step {} confirmed, turning finished", self.expected_index);
                self.done = true;
                TurnEvent::Finished
            }
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn expected_index(&self) -> usize {
        self.expected_index
    }

    /// Angle the machine is waiting for.
    pub fn current_target(&self) -> f64 {
        self.sequence.expected[self.expected_index]
    }

    pub fn state(&self) -> TurnState {
        TurnState {
            expected_index: self.expected_index,
            current_target_angle: self.current_target(),
            done: self.done,
        }
    }
}

impl Default for TurnStateMachine {
    fn default() -> Self {
        Self::new(TurnSequence::default())
    }
}

/// One-shot "turning done" signal, shared between threads.
#[derive(Debug, Clone, Default)]
pub struct TurnSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl TurnSignal {
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&self) -> MutexGuard<'_, bool> {
        // A poisoned flag is still a valid bool
        self.inner.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fire the signal. Later calls have no effect.
    pub fn complete(&self) {
        let mut done = self.flag();
        *done = true;
        self.inner.1.notify_all();
    }

    pub fn is_complete(&self) -> bool {
        *self.flag()
    }

    /// Block until the signal fires.
    pub fn wait(&self) {
        let mut done = self.flag();
        while !*done {
            done = self.inner.1.wait(done).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Block until the signal fires or `timeout` elapses; `true` if it fired.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let done = self.flag();
        let (done, _) = self
            .inner
            .1
            .wait_timeout_while(done, timeout, |d| !*d)
            .unwrap_or_else(|e| e.into_inner());
        *done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_default_sequence_runs_to_completion() {
        let mut machine = TurnStateMachine::default();

        assert_eq!(machine.on_joint_state(0.0), TurnEvent::Command(FRAC_PI_2));
        assert_eq!(machine.on_joint_state(FRAC_PI_2), TurnEvent::Command(-FRAC_PI_2));
        assert_eq!(machine.on_joint_state(-FRAC_PI_2), TurnEvent::Command(0.0));
        assert!(!machine.is_done());
        assert_eq!(machine.on_joint_state(0.0), TurnEvent::Finished);
        assert!(machine.is_done());

        // Nothing after the end
        assert_eq!(machine.on_joint_state(0.0), TurnEvent::Ignored);
        assert_eq!(machine.on_joint_state(FRAC_PI_2), TurnEvent::Ignored);
    }

    #[test]
    fn test_non_matching_angles_ignored() {
        let mut machine = TurnStateMachine::default();
        assert_eq!(machine.on_joint_state(0.3), TurnEvent::Ignored);
        assert_eq!(machine.on_joint_state(2e-4), TurnEvent::Ignored);
        assert_eq!(machine.expected_index(), 0);

        assert_eq!(machine.on_joint_state(5e-5), TurnEvent::Command(FRAC_PI_2));
        // Still at the old angle while the body is moving
        assert_eq!(machine.on_joint_state(0.0), TurnEvent::Ignored);
        assert_eq!(machine.on_joint_state(1.0), TurnEvent::Ignored);
        assert_eq!(machine.state().expected_index, 1);
        assert_eq!(machine.state().current_target_angle, FRAC_PI_2);
    }

    #[test]
    fn test_sequence_validation() {
        assert!(TurnSequence::new(vec![], vec![]).is_err());
        assert!(TurnSequence::new(vec![0.0, 1.0], vec![None]).is_err());
        assert!(TurnSequence::new(vec![0.0, 1.0], vec![None, Some(1.0)]).is_err());
        assert!(TurnSequence::new(vec![0.0, 1.0], vec![Some(1.0), Some(0.0)]).is_err());
        assert!(TurnSequence::new(vec![0.0, 1.0], vec![Some(1.0), None]).is_ok());
    }

    #[test]
    fn test_from_markers() {
        let seq = TurnSequence::from_markers(
            vec![0.0, FRAC_PI_2, -FRAC_PI_2, 0.0],
            vec![FRAC_PI_2, -FRAC_PI_2, 0.0, TURN_SENTINEL],
        )
        .unwrap();
        assert_eq!(seq, TurnSequence::pr2_default());
    }

    #[test]
    fn test_signal_wakes_waiter() {
        let signal = TurnSignal::new();
        assert!(!signal.wait_timeout(Duration::from_millis(10)));

        let remote = signal.clone();
        let waiter = thread::spawn(move || remote.wait_timeout(Duration::from_secs(5)));
        signal.complete();
        assert!(waiter.join().unwrap());
        assert!(signal.is_complete());

        // Already fired: wait returns immediately
        signal.wait();
    }
}
