//! Feedback rings of engines.
//!
//! Engine `i` reads channel `i` and writes channel `(i + 1) % n`, so the last
//! engine feeds the first. Every channel starts with its engine's phase
//! setting; channel 0 also receives the seed that starts the cycle. The ring
//! finishes when its terminal (last) engine halts, and its result is the
//! last value that engine produced.
//!
//! A plain serial chain is the degenerate case where every engine halts after
//! one output; the same driver handles both.

use crate::vm::{Channel, Engine, EngineError, InputPolicy, Step};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// A ring of engines running copies of one program.
pub struct FeedbackRing {
    engines: Vec<Engine>,
    channels: Vec<Channel>,
}

impl FeedbackRing {
    /// Build a ring with one engine per phase setting.
    pub fn new(program: &[i64], phases: &[i64]) -> Result<Self, RingError> {
        Self::with_policy(program, phases, InputPolicy::Suspend)
    }

    fn with_policy(program: &[i64], phases: &[i64], policy: InputPolicy) -> Result<Self, RingError> {
        if phases.is_empty() {
            return Err(RingError::Empty);
        }

        let channels: Vec<Channel> = phases.iter().map(|&phase| Channel::with_values([phase])).collect();
        let n = channels.len();
        let engines = (0..n)
            .map(|i| {
                Engine::with_channels(program, channels[i].clone(), channels[(i + 1) % n].clone())
                    .with_policy(policy)
            })
            .collect();

        Ok(Self { engines, channels })
    }

    /// Number of engines.
    pub fn len(&self) -> usize {
        self.engines.len()
    }

    /// Check if the ring has no engines (never true for a constructed ring).
    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Engines in ring order.
    pub fn engines(&self) -> &[Engine] {
        &self.engines
    }

    /// Drive the ring cooperatively from the calling thread.
    pub fn run(&mut self, seed: i64) -> Result<i64, RingError> {
        self.channels[0].push(seed);
        let terminal = self.engines.len() - 1;
        let mut last_output = None;

        loop {
            let mut progressed = false;

            for (index, engine) in self.engines.iter_mut().enumerate() {
                let before = engine.cycles();
                loop {
                    match engine.run_until_suspend() {
                        Step::Produced(value) => {
                            if index == terminal {
                                last_output = Some(value);
                            }
                        }
                        Step::NeedsInput | Step::Halted | Step::Continued => break,
                        Step::Failed(source) => return Err(RingError::Engine { index, source }),
                    }
                }
                progressed |= engine.cycles() != before;

                if index == terminal && engine.is_halted() {
                    return last_output.ok_or(RingError::NoOutput);
                }
            }

            if !progressed {
                return Err(RingError::Stalled);
            }
        }
    }

    /// Drive the ring with one thread per engine.
    ///
    /// Each engine blocks on its input channel for up to `timeout`; an engine
    /// still waiting after that is reported as a stall.
    pub fn run_threaded(program: &[i64], phases: &[i64], seed: i64, timeout: Duration) -> Result<i64, RingError> {
        let ring = Self::with_policy(program, phases, InputPolicy::Block { timeout })?;
        ring.channels[0].push(seed);
        let terminal = ring.engines.len() - 1;

        let results: Vec<Result<Option<i64>, RingError>> = thread::scope(|scope| {
            let handles: Vec<_> = ring
                .engines
                .into_iter()
                .enumerate()
                .map(|(index, mut engine)| {
                    scope.spawn(move || {
                        let mut last = None;
                        loop {
                            match engine.run_until_suspend() {
                                Step::Produced(value) => last = Some(value),
                                Step::Halted => return Ok(last),
                                Step::NeedsInput => return Err(RingError::Stalled),
                                Step::Failed(source) => return Err(RingError::Engine { index, source }),
                                Step::Continued => {}
                            }
                        }
                    })
                })
                .collect();

            handles
                .into_iter()
                .enumerate()
                .map(|(index, handle)| handle.join().unwrap_or(Err(RingError::Panicked { index })))
                .collect()
        });

        let mut terminal_output = None;
        for (index, result) in results.into_iter().enumerate() {
            let last = result?;
            if index == terminal {
                terminal_output = last;
            }
        }
        terminal_output.ok_or(RingError::NoOutput)
    }
}

/// Best phase permutation and the terminal output it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaxSignal {
    pub phases: Vec<i64>,
    pub signal: i64,
}

/// Try every permutation of `phases` and keep the largest terminal output.
///
/// Permutations are visited in lexicographic order of positions in `phases`;
/// the first permutation reaching the maximum wins.
pub fn max_signal(program: &[i64], phases: &[i64], seed: i64) -> Result<MaxSignal, RingError> {
    search_phases(phases, |candidate| FeedbackRing::new(program, candidate)?.run(seed))
}

/// Same search as [`max_signal`], running every ring with one thread per engine.
pub fn max_signal_threaded(
    program: &[i64],
    phases: &[i64],
    seed: i64,
    timeout: Duration,
) -> Result<MaxSignal, RingError> {
    search_phases(phases, |candidate| FeedbackRing::run_threaded(program, candidate, seed, timeout))
}

fn search_phases<F>(phases: &[i64], mut run: F) -> Result<MaxSignal, RingError>
where
    F: FnMut(&[i64]) -> Result<i64, RingError>,
{
    let mut best: Option<MaxSignal> = None;

    for order in Permutations::new(phases.len()) {
        let candidate: Vec<i64> = order.iter().map(|&i| phases[i]).collect();
        let signal = run(&candidate)?;
        log::debug!("phases {:?} -> {}", candidate, signal);

        if best.as_ref().map_or(true, |b| signal > b.signal) {
            best = Some(MaxSignal { phases: candidate, signal });
        }
    }

    best.ok_or(RingError::Empty)
}

/// Lexicographic permutations of `0..n`.
#[derive(Debug, Clone)]
pub struct Permutations {
    current: Option<Vec<usize>>,
}

impl Permutations {
    pub fn new(n: usize) -> Self {
        let current = (n > 0).then(|| (0..n).collect());
        Self { current }
    }
}

impl Iterator for Permutations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.current.take()?;
        let mut next = current.clone();

        // Standard next-permutation: find the rightmost ascent, swap with the
        // smallest larger element to its right, reverse the suffix.
        if let Some(pivot) = (0..next.len().saturating_sub(1)).rev().find(|&i| next[i] < next[i + 1]) {
            let successor = (pivot + 1..next.len())
                .rev()
                .find(|&j| next[j] > next[pivot])
                .unwrap_or(pivot + 1);
            next.swap(pivot, successor);
            next[pivot + 1..].reverse();
            self.current = Some(next);
        }

        Some(current)
    }
}

/// Errors that stop a ring.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RingError {
    #[error("ring has no engines")]
    Empty,

    #[error("engine {index} failed: {source}")]
    Engine { index: usize, source: EngineError },

    #[error("ring stalled: every engine is waiting for input")]
    Stalled,

    #[error("terminal engine halted without producing output")]
    NoOutput,

    #[error("worker thread for engine {index} panicked")]
    Panicked { index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERIAL: [i64; 17] = [3, 15, 3, 16, 1002, 16, 10, 16, 1, 16, 15, 15, 4, 15, 99, 0, 0];

    const FEEDBACK: [i64; 29] = [
        3, 26, 1001, 26, -4, 26, 3, 27, 1002, 27, 2, 27, 1, 27, 26, 27, 4, 27, 1001, 28, -1, 28,
        1005, 28, 6, 99, 0, 0, 5,
    ];

    #[test]
    fn test_permutations_lexicographic() {
        let all: Vec<_> = Permutations::new(3).collect();
        assert_eq!(
            all,
            vec![
                vec![0, 1, 2],
                vec![0, 2, 1],
                vec![1, 0, 2],
                vec![1, 2, 0],
                vec![2, 0, 1],
                vec![2, 1, 0],
            ]
        );
        assert_eq!(Permutations::new(5).count(), 120);
        assert_eq!(Permutations::new(0).count(), 0);
    }

    #[test]
    fn test_serial_chain() {
        let mut ring = FeedbackRing::new(&SERIAL, &[4, 3, 2, 1, 0]).unwrap();
        assert_eq!(ring.run(0).unwrap(), 43210);
    }

    #[test]
    fn test_serial_max_signal() {
        let best = max_signal(&SERIAL, &[0, 1, 2, 3, 4], 0).unwrap();
        assert_eq!(best.signal, 43210);
        assert_eq!(best.phases, vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_feedback_ring() {
        let mut ring = FeedbackRing::new(&FEEDBACK, &[9, 8, 7, 6, 5]).unwrap();
        assert_eq!(ring.run(0).unwrap(), 139629729);
        assert!(ring.engines().iter().all(|e| e.is_halted()));
    }

    #[test]
    fn test_threaded_matches_cooperative() {
        let signal = FeedbackRing::run_threaded(&FEEDBACK, &[9, 8, 7, 6, 5], 0, Duration::from_secs(5)).unwrap();
        assert_eq!(signal, 139629729);
    }

    #[test]
    fn test_threaded_search_matches_cooperative() {
        let timeout = Duration::from_secs(5);
        let threaded = max_signal_threaded(&FEEDBACK, &[5, 6, 7, 8, 9], 0, timeout).unwrap();
        assert_eq!(threaded, max_signal(&FEEDBACK, &[5, 6, 7, 8, 9], 0).unwrap());
        assert_eq!(threaded.phases, vec![9, 8, 7, 6, 5]);
    }

    #[test]
    fn test_stall_detected() {
        // Reads three values but a single-engine ring only ever holds two.
        let mut ring = FeedbackRing::new(&[3, 0, 3, 0, 3, 0, 99], &[1]).unwrap();
        assert_eq!(ring.run(0), Err(RingError::Stalled));
    }

    #[test]
    fn test_engine_failure_reports_index() {
        let mut ring = FeedbackRing::new(&[3, 0, 3, 0, 42], &[1, 2]).unwrap();
        assert!(matches!(ring.run(0), Err(RingError::Engine { index: 0, .. })));
    }

    #[test]
    fn test_empty_ring() {
        assert!(matches!(FeedbackRing::new(&SERIAL, &[]), Err(RingError::Empty)));
    }
}
