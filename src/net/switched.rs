//! Switched packet network of engines.
//!
//! Every engine is seeded with its address as the first input. Engines emit
//! packets as three consecutive outputs `(destination, x, y)`. Packets for
//! another engine are queued on its input channel; packets for the controller
//! address are held by the idle monitor instead.
//!
//! Scheduling is a FIFO of engines that may have work. Each engine taken from
//! the queue is drained until it next reports `NeedsInput`. When the queue
//! runs dry the whole network is idle, and the idle monitor injects the held
//! controller packet into engine 0 and requeues everyone. The same `y`
//! injected twice in a row means the network has settled.

use crate::vm::{Engine, EngineError, InputPolicy, Step};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use thiserror::Error;

/// Address of the controller inbox in the reference network.
pub const CONTROLLER_ADDRESS: i64 = 255;

/// Number of engines in the reference network.
pub const DEFAULT_SIZE: usize = 50;

/// A packet assembled from three consecutive outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPacket {
    pub destination: i64,
    pub x: i64,
    pub y: i64,
}

/// Network configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Number of engines.
    pub size: usize,
    /// Destination address of the controller inbox.
    pub controller: i64,
    /// Input policy for every engine.
    pub policy: InputPolicy,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE,
            controller: CONTROLLER_ADDRESS,
            policy: InputPolicy::network(),
        }
    }
}

impl NetworkConfig {
    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, NetworkError> {
        serde_json::from_str(text).map_err(|e| NetworkError::Config(e.to_string()))
    }

    /// Load a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, NetworkError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| NetworkError::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_json(&text)
    }
}

/// Result of running the idle monitor to steady state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SteadyState {
    /// The `y` value injected twice in a row.
    pub y: i64,
    /// Every `y` injected into engine 0, in order.
    pub injected: Vec<i64>,
}

/// Why a drained engine stopped.
enum Drain {
    /// The engine is waiting for input.
    Idle,
    /// A packet for the controller arrived and the caller asked to stop on it.
    Controller(NetworkPacket),
}

/// A switched network of engines running copies of one program.
pub struct SwitchedNetwork {
    config: NetworkConfig,
    engines: Vec<Engine>,
    /// Partial packets per engine.
    pending: Vec<Vec<i64>>,
    /// Engines with possible work, in service order.
    not_idle: VecDeque<usize>,
    /// Most recent controller packet not yet injected.
    held: Option<NetworkPacket>,
    /// Every packet delivered to the controller.
    controller_log: Vec<NetworkPacket>,
}

impl SwitchedNetwork {
    /// Build a network, seeding each engine with its address.
    pub fn new(program: &[i64], config: NetworkConfig) -> Result<Self, NetworkError> {
        if config.size == 0 {
            return Err(NetworkError::Empty);
        }

        let engines: Vec<Engine> = (0..config.size)
            .map(|address| {
                let engine = Engine::new(program).with_policy(config.policy);
                engine.push_input(address as i64);
                engine
            })
            .collect();

        Ok(Self {
            config,
            pending: vec![Vec::with_capacity(3); engines.len()],
            not_idle: (0..engines.len()).collect(),
            engines,
            held: None,
            controller_log: Vec::new(),
        })
    }

    /// Network configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Engines in address order.
    pub fn engines(&self) -> &[Engine] {
        &self.engines
    }

    /// Packets delivered to the controller so far.
    pub fn controller_log(&self) -> &[NetworkPacket] {
        &self.controller_log
    }

    /// Run until the first packet reaches the controller.
    pub fn first_controller_packet(&mut self) -> Result<NetworkPacket, NetworkError> {
        while let Some(index) = self.not_idle.pop_front() {
            if let Drain::Controller(packet) = self.drain(index, true)? {
                return Ok(packet);
            }
        }
        Err(NetworkError::Deadlocked)
    }

    /// Run the idle monitor until the same `y` is injected twice in a row.
    pub fn run_until_steady(&mut self) -> Result<SteadyState, NetworkError> {
        let mut injected = Vec::new();
        let mut last_y = None;

        loop {
            while let Some(index) = self.not_idle.pop_front() {
                self.drain(index, false)?;
            }

            // Full idle pass: nothing queued and every engine waiting.
            let packet = self.held.take().ok_or(NetworkError::Deadlocked)?;
            if last_y == Some(packet.y) {
                log::debug!("network settled on y={}", packet.y);
                return Ok(SteadyState { y: packet.y, injected });
            }

            log::debug!("network idle, injecting ({}, {}) into engine 0", packet.x, packet.y);
            last_y = Some(packet.y);
            injected.push(packet.y);

            let engine = &self.engines[0];
            engine.push_input(packet.x);
            engine.push_input(packet.y);
            self.not_idle = (0..self.engines.len()).collect();
        }
    }

    /// Service one engine until it waits for input, routing its packets.
    fn drain(&mut self, index: usize, stop_at_controller: bool) -> Result<Drain, NetworkError> {
        loop {
            match self.engines[index].run_until_suspend() {
                Step::Produced(_) => {
                    while let Some(value) = self.engines[index].output().pop() {
                        self.pending[index].push(value);
                        if self.pending[index].len() < 3 {
                            continue;
                        }
                        let packet = NetworkPacket {
                            destination: self.pending[index][0],
                            x: self.pending[index][1],
                            y: self.pending[index][2],
                        };
                        self.pending[index].clear();
                        if self.route(index, packet)? && stop_at_controller {
                            return Ok(Drain::Controller(packet));
                        }
                    }
                }
                Step::NeedsInput | Step::Continued => return Ok(Drain::Idle),
                Step::Halted => return Err(NetworkError::EngineHalted { index }),
                Step::Failed(source) => return Err(NetworkError::Engine { index, source }),
            }
        }
    }

    /// Deliver a packet. Returns true if it went to the controller.
    fn route(&mut self, from: usize, packet: NetworkPacket) -> Result<bool, NetworkError> {
        log::debug!("{:02} -> {:02} ({}, {})", from, packet.destination, packet.x, packet.y);

        if packet.destination == self.config.controller {
            self.held = Some(packet);
            self.controller_log.push(packet);
            return Ok(true);
        }

        let dest = usize::try_from(packet.destination)
            .ok()
            .filter(|&d| d < self.engines.len())
            .ok_or(NetworkError::UnknownDestination { from, packet })?;

        let engine = &self.engines[dest];
        engine.push_input(packet.x);
        engine.push_input(packet.y);
        if !self.not_idle.contains(&dest) {
            self.not_idle.push_back(dest);
        }
        Ok(false)
    }
}

/// Errors that stop a network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("network has no engines")]
    Empty,

    #[error("engine {index} failed: {source}")]
    Engine { index: usize, source: EngineError },

    #[error("engine {index} halted")]
    EngineHalted { index: usize },

    #[error("engine {from} sent a packet to unknown address {}", .packet.destination)]
    UnknownDestination { from: usize, packet: NetworkPacket },

    #[error("network is idle with no controller packet to inject")]
    Deadlocked,

    #[error("invalid network config: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suspend_config(size: usize) -> NetworkConfig {
        NetworkConfig { size, policy: InputPolicy::Suspend, ..NetworkConfig::default() }
    }

    /// Reads its address, sends (255, 0, initial_y), then for every packet
    /// (x, y) it receives sends (255, x, y + 1) while y < 3, else (255, x, y).
    fn counting_node(initial_y: i64) -> Vec<i64> {
        vec![
            3, 100, // in [100]
            104, 255, 104, 0, 104, initial_y, // out 255, 0, initial_y
            3, 102, // 8: in x
            3, 103, // in y
            1007, 103, 3, 104, // [104] = y < 3
            1006, 104, 23, // if ![104] goto 23
            1001, 103, 1, 103, // y += 1
            104, 255, 4, 102, 4, 103, // 23: out 255, x, y
            1105, 1, 8, // goto 8
        ]
    }

    #[test]
    fn test_repeated_y_terminates() {
        let mut net = SwitchedNetwork::new(&counting_node(5), suspend_config(2)).unwrap();
        let steady = net.run_until_steady().unwrap();
        assert_eq!(steady, SteadyState { y: 5, injected: vec![5] });
    }

    #[test]
    fn test_differing_y_does_not_terminate() {
        let mut net = SwitchedNetwork::new(&counting_node(1), suspend_config(2)).unwrap();
        let steady = net.run_until_steady().unwrap();
        assert_eq!(steady.y, 3);
        assert_eq!(steady.injected, vec![1, 2, 3]);
    }

    #[test]
    fn test_first_controller_packet() {
        let mut net = SwitchedNetwork::new(&counting_node(9), suspend_config(3)).unwrap();
        let packet = net.first_controller_packet().unwrap();
        assert_eq!(packet, NetworkPacket { destination: 255, x: 0, y: 9 });
        assert_eq!(net.controller_log().len(), 1);
    }

    #[test]
    fn test_deadlock_without_controller_packet() {
        let mut net = SwitchedNetwork::new(&[3, 100, 3, 101, 99], suspend_config(2)).unwrap();
        assert_eq!(net.run_until_steady(), Err(NetworkError::Deadlocked));
    }

    #[test]
    fn test_unknown_destination() {
        let mut net = SwitchedNetwork::new(&[104, 7, 104, 1, 104, 2, 99], suspend_config(2)).unwrap();
        assert_eq!(
            net.run_until_steady(),
            Err(NetworkError::UnknownDestination {
                from: 0,
                packet: NetworkPacket { destination: 7, x: 1, y: 2 },
            })
        );
    }

    #[test]
    fn test_halted_engine_is_an_error() {
        let mut net = SwitchedNetwork::new(&[3, 100, 99], suspend_config(1)).unwrap();
        assert_eq!(net.run_until_steady(), Err(NetworkError::EngineHalted { index: 0 }));
    }

    #[test]
    fn test_peer_delivery_requeues_destination() {
        // Engine 0 forwards (1, 4, 6) to engine 1; engine 1 reports its first
        // packet to the controller.
        let program = vec![
            3, 100, // in address
            1005, 100, 11, // if address != 0 goto 11
            104, 1, 104, 4, 104, 6, // out 1, 4, 6
            3, 101, 3, 102, // 11: in x, in y
            104, 255, 4, 101, 4, 102, // out 255, x, y
            1105, 1, 11, // goto 11
        ];
        let mut net = SwitchedNetwork::new(&program, suspend_config(2)).unwrap();
        let packet = net.first_controller_packet().unwrap();
        assert_eq!(packet, NetworkPacket { destination: 255, x: 4, y: 6 });
    }

    #[test]
    fn test_sending_between_empty_reads_is_not_idle() {
        // Polls once, sends y=7, polls again, sends y=8, then echoes every
        // packet it receives. Idle must not be declared until after y=8.
        let program = vec![
            3, 100, // in address
            3, 101, // in x (empty)
            104, 255, 104, 0, 104, 7, // out 255, 0, 7
            3, 101, // in x (empty)
            104, 255, 104, 0, 104, 8, // out 255, 0, 8
            3, 101, // 18: in x
            1008, 101, -1, 103, // [103] = x == -1
            1005, 103, 18, // if [103] goto 18
            3, 102, // in y
            104, 255, 4, 101, 4, 102, // out 255, x, y
            1105, 1, 18, // goto 18
        ];
        let config = NetworkConfig { size: 1, ..NetworkConfig::default() };
        let mut net = SwitchedNetwork::new(&program, config).unwrap();
        let steady = net.run_until_steady().unwrap();
        assert_eq!(steady, SteadyState { y: 8, injected: vec![8] });
    }

    #[test]
    fn test_config_from_json_defaults() {
        let config = NetworkConfig::from_json(r#"{"size": 4}"#).unwrap();
        assert_eq!(config.size, 4);
        assert_eq!(config.controller, CONTROLLER_ADDRESS);
        assert_eq!(config.policy, InputPolicy::network());

        let config = NetworkConfig::from_json(r#"{"policy": {"kind": "suspend"}}"#).unwrap();
        assert_eq!(config.policy, InputPolicy::Suspend);
        assert!(NetworkConfig::from_json("{").is_err());
    }

    #[test]
    fn test_empty_network() {
        assert!(matches!(
            SwitchedNetwork::new(&[99], suspend_config(0)),
            Err(NetworkError::Empty)
        ));
    }
}
