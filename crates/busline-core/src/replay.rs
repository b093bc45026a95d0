//! Input logging and deterministic replay.
//!
//! A log is the level data plus the exact input sequence, with state-hash
//! checkpoints sprinkled through it. Replaying rebuilds the simulation from
//! the level and re-applies the inputs; because construction and every
//! operation are deterministic, the recorded entity keys and move tokens
//! mean the same thing on both runs, and any divergence shows up at the
//! next checkpoint.

use crate::id::PassengerId;
use crate::level::{LevelData, LevelError};
use crate::movement::MoveToken;
use crate::sim::PuzzleSimulation;
use serde::{Deserialize, Serialize};

/// Inputs are checkpointed every this many entries unless configured
/// otherwise.
pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 16;

/// One recorded call into the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputRecord {
    Select(PassengerId),
    CompleteMove(MoveToken),
}

/// State hash after the first `input_index` inputs were applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashCheckpoint {
    pub input_index: usize,
    pub state_hash: u64,
}

/// A complete recorded session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputLog {
    pub level: LevelData,
    pub inputs: Vec<InputRecord>,
    pub checkpoints: Vec<HashCheckpoint>,
}

/// First point where a replay diverged from the recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayMismatch {
    pub input_index: usize,
    pub expected_hash: u64,
    pub actual_hash: u64,
}

/// Result of re-running a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayOutcome {
    pub final_hash: u64,
    pub mismatch: Option<ReplayMismatch>,
}

impl ReplayOutcome {
    pub fn is_faithful(&self) -> bool {
        self.mismatch.is_none()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("failed to encode input log: {0}")]
    Encode(#[source] bitcode::Error),
    #[error("failed to decode input log: {0}")]
    Decode(#[source] bitcode::Error),
}

impl InputLog {
    pub fn to_bytes(&self) -> Result<Vec<u8>, ReplayError> {
        bitcode::serialize(self).map_err(ReplayError::Encode)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<InputLog, ReplayError> {
        bitcode::deserialize(bytes).map_err(ReplayError::Decode)
    }

    /// Rebuild the simulation and re-apply every input, verifying the
    /// checkpoints along the way. Stops at the first mismatch.
    pub fn replay(&self) -> Result<ReplayOutcome, LevelError> {
        let mut sim = PuzzleSimulation::new(self.level.clone())?;
        let mut pending = self.checkpoints.iter().peekable();
        for (i, input) in self.inputs.iter().enumerate() {
            match input {
                // Outcomes were observed when recording; only the state
                // transitions matter here.
                InputRecord::Select(id) => {
                    let _ = sim.select_passenger(*id);
                }
                InputRecord::CompleteMove(token) => {
                    let _ = sim.complete_move(*token);
                }
            }
            while let Some(cp) = pending.peek() {
                if cp.input_index != i + 1 {
                    break;
                }
                let actual = sim.state_hash();
                if actual != cp.state_hash {
                    return Ok(ReplayOutcome {
                        final_hash: actual,
                        mismatch: Some(ReplayMismatch {
                            input_index: cp.input_index,
                            expected_hash: cp.state_hash,
                            actual_hash: actual,
                        }),
                    });
                }
                pending.next();
            }
        }
        Ok(ReplayOutcome {
            final_hash: sim.state_hash(),
            mismatch: None,
        })
    }
}

/// Builds an [`InputLog`] while a live session plays out. Call
/// [`InputRecorder::record`] after each applied input with the simulation it
/// was applied to.
pub struct InputRecorder {
    log: InputLog,
    interval: usize,
}

impl InputRecorder {
    pub fn new(level: LevelData) -> Self {
        Self::with_interval(level, DEFAULT_CHECKPOINT_INTERVAL)
    }

    pub fn with_interval(level: LevelData, interval: usize) -> Self {
        Self {
            log: InputLog {
                level,
                inputs: Vec::new(),
                checkpoints: Vec::new(),
            },
            interval: interval.max(1),
        }
    }

    pub fn record(&mut self, input: InputRecord, sim: &PuzzleSimulation) {
        self.log.inputs.push(input);
        if self.log.inputs.len() % self.interval == 0 {
            self.push_checkpoint(sim);
        }
    }

    /// Seal the log with a final checkpoint.
    pub fn finish(mut self, sim: &PuzzleSimulation) -> InputLog {
        self.push_checkpoint(sim);
        self.log
    }

    fn push_checkpoint(&mut self, sim: &PuzzleSimulation) {
        let input_index = self.log.inputs.len();
        if self
            .log
            .checkpoints
            .last()
            .is_some_and(|cp| cp.input_index == input_index)
        {
            return;
        }
        self.log.checkpoints.push(HashCheckpoint {
            input_index,
            state_hash: sim.state_hash(),
        });
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::passenger::PassengerColor;
    use crate::test_utils::{passenger_at, LevelBuilder};

    fn play_and_record() -> (InputLog, u64) {
        let level = LevelBuilder::new(3, 3)
            .passenger(0, 2, PassengerColor::Red)
            .passenger(2, 2, PassengerColor::Red)
            .bus(PassengerColor::Red)
            .build();
        let mut sim = PuzzleSimulation::new(level.clone()).unwrap();
        let mut recorder = InputRecorder::with_interval(level, 2);

        // Complete the initial bus arrival, then board both passengers,
        // recording every input as it is applied.
        let arrival = sim
            .drain_events()
            .iter()
            .find_map(|e| match e {
                Event::BusArriving { token } => Some(*token),
                _ => None,
            })
            .unwrap();
        sim.complete_move(arrival).unwrap();
        recorder.record(InputRecord::CompleteMove(arrival), &sim);

        for x in [0, 2] {
            let p = passenger_at(&sim, x, 2);
            sim.select_passenger(p).unwrap();
            recorder.record(InputRecord::Select(p), &sim);
            let token = sim
                .drain_events()
                .iter()
                .find_map(|e| match e {
                    Event::MoveRequested { token, .. } => Some(*token),
                    _ => None,
                })
                .unwrap();
            sim.complete_move(token).unwrap();
            recorder.record(InputRecord::CompleteMove(token), &sim);
        }

        let final_hash = sim.state_hash();
        (recorder.finish(&sim), final_hash)
    }

    #[test]
    fn replay_reproduces_the_recorded_session() {
        let (log, final_hash) = play_and_record();
        assert!(!log.checkpoints.is_empty());
        let outcome = log.replay().unwrap();
        assert!(outcome.is_faithful());
        assert_eq!(outcome.final_hash, final_hash);
    }

    #[test]
    fn log_survives_an_encode_decode_roundtrip() {
        let (log, _) = play_and_record();
        let bytes = log.to_bytes().unwrap();
        let decoded = InputLog::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, log);
        assert!(decoded.replay().unwrap().is_faithful());
    }

    #[test]
    fn tampered_checkpoint_is_reported_as_a_mismatch() {
        let (mut log, _) = play_and_record();
        log.checkpoints[0].state_hash ^= 0xdead_beef;
        let outcome = log.replay().unwrap();
        let mismatch = outcome.mismatch.expect("expected a mismatch");
        assert_eq!(mismatch.input_index, log.checkpoints[0].input_index);
    }
}
