//! Direct duplex: one engine paired with a synchronous controller.
//!
//! The controller watches everything the engine emits and computes each input
//! on demand from what it has seen so far, e.g. a joystick position derived
//! from the last rendered frame.

use crate::vm::{Engine, EngineError, Step};

/// The adapter side of a duplex link.
pub trait Controller {
    /// Observe a value emitted by the engine.
    fn observe(&mut self, value: i64);

    /// Produce the next input value. `None` detaches the controller.
    fn supply(&mut self) -> Option<i64>;
}

/// How a duplex session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplexOutcome {
    /// The engine halted.
    Halted,
    /// The controller declined to supply input.
    Detached,
}

/// Drive `engine` until it halts or `controller` detaches.
pub fn run_duplex<C: Controller + ?Sized>(
    engine: &mut Engine,
    controller: &mut C,
) -> Result<DuplexOutcome, EngineError> {
    loop {
        match engine.run_until_suspend() {
            Step::Produced(_) => {
                for value in engine.drain_output() {
                    controller.observe(value);
                }
            }
            Step::NeedsInput => match controller.supply() {
                Some(value) => engine.push_input(value),
                None => {
                    log::debug!("duplex controller detached at pc={}", engine.pc());
                    return Ok(DuplexOutcome::Detached);
                }
            },
            Step::Halted => {
                for value in engine.drain_output() {
                    controller.observe(value);
                }
                return Ok(DuplexOutcome::Halted);
            }
            Step::Failed(err) => return Err(err),
            Step::Continued => {}
        }
    }
}

/// A controller built from two closures.
pub struct FnController<O, S> {
    observe: O,
    supply: S,
}

impl<O, S> FnController<O, S>
where
    O: FnMut(i64),
    S: FnMut() -> Option<i64>,
{
    pub fn new(observe: O, supply: S) -> Self {
        Self { observe, supply }
    }
}

impl<O, S> Controller for FnController<O, S>
where
    O: FnMut(i64),
    S: FnMut() -> Option<i64>,
{
    fn observe(&mut self, value: i64) {
        (self.observe)(value)
    }

    fn supply(&mut self) -> Option<i64> {
        (self.supply)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Reads a value, outputs it doubled, forever.
    const DOUBLER: [i64; 9] = [3, 20, 1002, 20, 2, 20, 4, 20, 1105];

    fn doubler() -> Vec<i64> {
        let mut program = DOUBLER.to_vec();
        program.extend([1, 0]);
        program
    }

    /// Feeds back the last observed value plus one, stopping past a limit.
    struct Counter {
        last: i64,
        seen: Vec<i64>,
        limit: i64,
    }

    impl Controller for Counter {
        fn observe(&mut self, value: i64) {
            self.last = value;
            self.seen.push(value);
        }

        fn supply(&mut self) -> Option<i64> {
            (self.last < self.limit).then_some(self.last + 1)
        }
    }

    #[test]
    fn test_inputs_follow_outputs() {
        let mut engine = Engine::new(&doubler());
        let mut controller = Counter { last: 0, seen: Vec::new(), limit: 20 };

        let outcome = run_duplex(&mut engine, &mut controller).unwrap();

        assert_eq!(outcome, DuplexOutcome::Detached);
        // 1 -> 2, 3 -> 6, 7 -> 14, 15 -> 30
        assert_eq!(controller.seen, vec![2, 6, 14, 30]);
    }

    #[test]
    fn test_halting_engine() {
        let mut engine = Engine::new(&[104, 1, 104, 2, 99]);
        let seen = RefCell::new(Vec::new());
        let mut controller = FnController::new(|v| seen.borrow_mut().push(v), || None);

        let outcome = run_duplex(&mut engine, &mut controller).unwrap();

        assert_eq!(outcome, DuplexOutcome::Halted);
        assert_eq!(seen.into_inner(), vec![1, 2]);
    }

    #[test]
    fn test_engine_failure_propagates() {
        let mut engine = Engine::new(&[3, 0, 42]);
        let mut controller = FnController::new(|_| {}, || Some(7));
        assert!(run_duplex(&mut engine, &mut controller).is_err());
    }
}
