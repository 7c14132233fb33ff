//! # Prediction Reconciliation
//!
//! When the host corrects tick T, the matching history entry is overwritten
//! with the authoritative state and every later entry is re-simulated in
//! order through the same reduction and integration rules. Replay runs
//! synchronously within one simulation tick and is deterministic given
//! identical inputs and binding order - that is what makes client and host
//! converge.

use skein_shared::{Tick, Vec3};

use crate::action::ActionState;
use crate::history::{InputHistory, PredictedState};

/// Authoritative state received from the host for one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Correction {
    /// The tick the host simulated.
    pub tick: Tick,
    /// Authoritative position.
    pub position: Vec3,
    /// Authoritative velocity.
    pub velocity: Vec3,
}

/// How a correction was absorbed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The entry was found; `replayed` later ticks were re-simulated.
    Applied {
        /// Number of entries re-simulated after the corrected tick.
        replayed: usize,
    },
    /// The entry was already pruned - the divergence is silently accepted.
    MissAccepted,
}

/// The simulation's integration seam: one predicted step from the recorded
/// action states. Must be deterministic - same states, same input state,
/// same output - or replay will not converge with the host.
pub trait StepSimulation {
    /// Advances `predicted` by one tick under `states`.
    fn step(&mut self, states: &[ActionState], predicted: &mut PredictedState);
}

impl InputHistory {
    /// Applies a host correction and deterministically replays every later
    /// entry.
    ///
    /// A correction for a tick that is no longer retained (pruned by cap or
    /// acknowledgment) is a logged no-op: the host's state is simply
    /// accepted going forward.
    pub fn reconcile(
        &mut self,
        correction: &Correction,
        stepper: &mut impl StepSimulation,
    ) -> ReconcileOutcome {
        let Some(index) = self.index_of(correction.tick) else {
            tracing::debug!(
                tick = correction.tick,
                "correction for pruned tick, divergence accepted"
            );
            return ReconcileOutcome::MissAccepted;
        };

        self.entries[index].predicted = PredictedState {
            position: correction.position,
            velocity: correction.velocity,
        };

        let mut predicted = self.entries[index].predicted;
        let mut replayed = 0;
        for entry in self.entries.iter_mut().skip(index + 1) {
            stepper.step(&entry.states, &mut predicted);
            entry.predicted = predicted;
            replayed += 1;
        }

        ReconcileOutcome::Applied { replayed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionState, ButtonState};
    use crate::history::HistoryEntry;
    use skein_shared::Vec2;

    /// Deterministic integrator: velocity follows the move vector, jumping
    /// adds an impulse, position integrates at a fixed dt.
    struct Integrator;

    const DT: f32 = 1.0 / 60.0;
    const SPEED: f32 = 5.0;

    impl StepSimulation for Integrator {
        fn step(&mut self, states: &[ActionState], predicted: &mut PredictedState) {
            let mut velocity = predicted.velocity;
            if let Some(ActionState::Vector2(movement)) = states.first() {
                velocity.x = movement.x * SPEED;
                velocity.z = movement.y * SPEED;
            }
            if let Some(ActionState::Button(jump)) = states.get(1) {
                if jump.pressed {
                    velocity.y += 8.0;
                }
            }
            predicted.velocity = velocity;
            predicted.position = predicted.position + velocity * DT;
        }
    }

    fn states(move_x: f32, jump_pressed: bool) -> Box<[ActionState]> {
        Box::new([
            ActionState::Vector2(Vec2::new(move_x, 0.0)),
            ActionState::Button(ButtonState {
                pressed: jump_pressed,
                released: false,
                held: jump_pressed,
            }),
        ])
    }

    /// Simulates ticks 1..=n from scratch, recording history like a local
    /// simulation loop would.
    fn simulate(inputs: &[(f32, bool)], start: PredictedState) -> InputHistory {
        let mut history = InputHistory::new(64);
        let mut predicted = start;
        let mut stepper = Integrator;
        for (index, (move_x, jump)) in inputs.iter().enumerate() {
            let tick_states = states(*move_x, *jump);
            stepper.step(&tick_states, &mut predicted);
            history.push(HistoryEntry {
                tick: (index + 1) as u64,
                states: tick_states,
                predicted,
            });
        }
        history
    }

    #[test]
    fn test_replay_matches_clean_simulation_from_correction() {
        let inputs = [
            (1.0, false),
            (1.0, true),
            (0.5, false),
            (0.0, false),
            (-1.0, false),
            (-1.0, false),
        ];
        let mut history = simulate(&inputs, PredictedState::default());

        // Host disagrees about tick 3.
        let correction = Correction {
            tick: 3,
            position: Vec3::new(10.0, 0.0, 0.0),
            velocity: Vec3::new(1.0, 0.0, 0.0),
        };
        let outcome = history.reconcile(&correction, &mut Integrator);
        assert_eq!(outcome, ReconcileOutcome::Applied { replayed: 3 });

        // Reference: as if the correction had been known at tick 3 - run
        // ticks 4..=6 from the corrected state.
        let mut reference = PredictedState {
            position: correction.position,
            velocity: correction.velocity,
        };
        let mut stepper = Integrator;
        for (move_x, jump) in &inputs[3..] {
            stepper.step(&states(*move_x, *jump), &mut reference);
        }

        assert_eq!(history.latest().unwrap().predicted, reference);
    }

    #[test]
    fn test_replay_is_deterministic() {
        let inputs = [(1.0, false), (0.0, true), (-0.5, false), (1.0, false)];
        let correction = Correction {
            tick: 2,
            position: Vec3::new(3.0, 1.0, 0.0),
            velocity: Vec3::ZERO,
        };

        let mut first = simulate(&inputs, PredictedState::default());
        let mut second = simulate(&inputs, PredictedState::default());
        first.reconcile(&correction, &mut Integrator);
        second.reconcile(&correction, &mut Integrator);

        assert_eq!(
            first.latest().unwrap().predicted,
            second.latest().unwrap().predicted
        );
    }

    #[test]
    fn test_correction_for_pruned_tick_is_accepted_divergence() {
        let inputs = [(1.0, false), (1.0, false), (1.0, false)];
        let mut history = simulate(&inputs, PredictedState::default());
        history.acknowledge(2);

        let before: Vec<PredictedState> =
            history.entries.iter().map(|entry| entry.predicted).collect();

        let correction = Correction { tick: 1, position: Vec3::ZERO, velocity: Vec3::ZERO };
        let outcome = history.reconcile(&correction, &mut Integrator);
        assert_eq!(outcome, ReconcileOutcome::MissAccepted);

        // Nothing was touched.
        let after: Vec<PredictedState> =
            history.entries.iter().map(|entry| entry.predicted).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_correction_at_latest_tick_replays_nothing() {
        let inputs = [(1.0, false), (0.0, false)];
        let mut history = simulate(&inputs, PredictedState::default());

        let correction = Correction {
            tick: 2,
            position: Vec3::new(0.5, 0.0, 0.0),
            velocity: Vec3::ZERO,
        };
        let outcome = history.reconcile(&correction, &mut Integrator);
        assert_eq!(outcome, ReconcileOutcome::Applied { replayed: 0 });
        assert_eq!(history.latest().unwrap().predicted.position, correction.position);
    }
}
