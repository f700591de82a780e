//! Worker thread owning the simulator.
//!
//! The simulator runs in an isolated thread; the only traffic across the
//! boundary is commands in and events out. Commands are drained FIFO
//! between steps, so no command ever observes a half-updated step. While
//! running and not paused the worker advances `steps_per_frame` steps per
//! iteration and emits a fresh state snapshot after each batch.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Result};
use crossfire::TryRecvError;
use crossfire::TrySendError;
use tracing::{debug, info, warn};

use gridlife_core::{SimConfig, Simulator};

use crate::command::{
    create_command_bus, create_event_bus, CommandReceiver, CommandSender, EventReceiver,
    EventSender, SimCommand, SimEvent,
};
use crate::config_patch;

const COMMAND_QUEUE_CAPACITY: usize = 64;
const EVENT_QUEUE_CAPACITY: usize = 256;
const IDLE_SLEEP: Duration = Duration::from_millis(2);
const EMIT_RETRY_SLEEP: Duration = Duration::from_millis(1);

/// Handle to the running simulation worker.
pub struct SimHost {
    commands: CommandSender,
    thread: Option<JoinHandle<()>>,
}

impl SimHost {
    /// Spawn the worker. With `initial` the simulator is constructed
    /// immediately; otherwise the first `Init` (or an implicit default on
    /// `Step`/`Start`) builds it.
    pub fn launch(initial: Option<SimConfig>) -> Result<(Self, EventReceiver)> {
        let (command_tx, command_rx) = create_command_bus(COMMAND_QUEUE_CAPACITY);
        let (event_tx, event_rx) = create_event_bus(EVENT_QUEUE_CAPACITY);

        let thread = thread::Builder::new()
            .name("gridlife-sim".into())
            .spawn(move || worker_loop(initial, &command_rx, &event_tx))?;

        Ok((
            Self {
                commands: command_tx,
                thread: Some(thread),
            },
            event_rx,
        ))
    }

    /// Queue a command for the worker.
    pub fn send(&self, command: SimCommand) -> Result<()> {
        match self.commands.try_send(command) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(anyhow!("command queue is full; retry later")),
            Err(TrySendError::Disconnected(_)) => Err(anyhow!("simulation worker has exited")),
        }
    }

    /// Request shutdown and block until the worker exits.
    pub fn shutdown(mut self) -> Result<()> {
        let _ = self.send(SimCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|err| anyhow!("simulation worker panicked: {err:?}"))?;
        }
        Ok(())
    }
}

impl Drop for SimHost {
    fn drop(&mut self) {
        let _ = self.commands.try_send(SimCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("simulation worker panicked during drop");
            }
        }
    }
}

struct WorkerState {
    simulator: Option<Simulator>,
    running: bool,
    paused: bool,
    steps_per_frame: u32,
}

impl WorkerState {
    fn new(initial: Option<Simulator>) -> Self {
        Self {
            simulator: initial,
            running: false,
            paused: false,
            steps_per_frame: 1,
        }
    }

    /// Lazily construct the simulator with default parameters, for hosts
    /// that step before initializing.
    fn ensure_simulator(&mut self, events: &EventSender) -> bool {
        if self.simulator.is_some() {
            return true;
        }
        match Simulator::new(SimConfig::default()) {
            Ok(simulator) => {
                self.simulator = Some(simulator);
                true
            }
            Err(err) => {
                emit(events, SimEvent::Error {
                    message: err.to_string(),
                });
                false
            }
        }
    }

    /// One step, rolling the generation at the boundary.
    fn advance_one_step(&mut self, events: &EventSender) {
        let Some(simulator) = self.simulator.as_mut() else {
            return;
        };
        simulator.step_once();
        if simulator.sim_step() >= simulator.config().steps_per_generation {
            let stats = simulator.end_generation();
            emit(events, SimEvent::GenerationComplete { stats });
            if simulator.generation() >= simulator.config().max_generations {
                self.running = false;
            }
        }
    }

    fn emit_state(&self, events: &EventSender) {
        if let Some(simulator) = &self.simulator {
            offer_frame(events, SimEvent::State {
                snapshot: simulator.snapshot(),
                running: self.running,
                paused: self.paused,
            });
        }
    }
}

fn worker_loop(initial: Option<SimConfig>, commands: &CommandReceiver, events: &EventSender) {
    let simulator = initial.and_then(|config| match Simulator::new(config) {
        Ok(simulator) => Some(simulator),
        Err(err) => {
            emit(events, SimEvent::Error {
                message: err.to_string(),
            });
            None
        }
    });
    let mut state = WorkerState::new(simulator);
    if state.simulator.is_some() {
        state.emit_state(events);
    }
    info!("simulation worker started");

    loop {
        // Drain every pending command before stepping.
        loop {
            match commands.try_recv() {
                Ok(command) => {
                    if handle_command(&mut state, command, events) == Flow::Exit {
                        info!("simulation worker exiting");
                        return;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!("command channel closed; simulation worker exiting");
                    return;
                }
            }
        }

        if state.running && !state.paused && state.simulator.is_some() {
            let batch = state.steps_per_frame;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                for _ in 0..batch {
                    if !state.running {
                        break;
                    }
                    state.advance_one_step(events);
                }
            }));
            if outcome.is_err() {
                state.running = false;
                emit(events, SimEvent::Error {
                    message: "simulation step panicked; reset required".into(),
                });
            }
            state.emit_state(events);
        } else {
            thread::sleep(IDLE_SLEEP);
        }
    }
}

#[derive(PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

fn handle_command(state: &mut WorkerState, command: SimCommand, events: &EventSender) -> Flow {
    debug!(?command, "processing command");
    match command {
        SimCommand::Init { params } | SimCommand::Reset {
            params: Some(params),
        } => match Simulator::new(params) {
            Ok(simulator) => {
                state.simulator = Some(simulator);
                state.running = false;
                state.paused = false;
                state.emit_state(events);
            }
            Err(err) => emit(events, SimEvent::Error {
                message: err.to_string(),
            }),
        },
        SimCommand::Reset { params: None } => {
            let config = state
                .simulator
                .as_ref()
                .map(|simulator| simulator.config().clone())
                .unwrap_or_default();
            match Simulator::new(config) {
                Ok(simulator) => {
                    state.simulator = Some(simulator);
                    state.running = false;
                    state.paused = false;
                    state.emit_state(events);
                }
                Err(err) => emit(events, SimEvent::Error {
                    message: err.to_string(),
                }),
            }
        }
        SimCommand::Start => {
            if state.ensure_simulator(events) {
                state.running = true;
                state.paused = false;
            }
        }
        SimCommand::Pause => state.paused = true,
        SimCommand::Resume => state.paused = false,
        SimCommand::Step => {
            if state.ensure_simulator(events) {
                state.advance_one_step(events);
                state.emit_state(events);
            }
        }
        SimCommand::StepGeneration => {
            if state.ensure_simulator(events) {
                let start_generation = state
                    .simulator
                    .as_ref()
                    .map(Simulator::generation)
                    .unwrap_or_default();
                while state
                    .simulator
                    .as_ref()
                    .is_some_and(|simulator| simulator.generation() == start_generation)
                {
                    state.advance_one_step(events);
                }
                state.emit_state(events);
            }
        }
        SimCommand::UpdateParams { patch } => {
            let Some(simulator) = state.simulator.as_mut() else {
                emit(events, SimEvent::Error {
                    message: "no simulation to update; init first".into(),
                });
                return Flow::Continue;
            };
            let result = config_patch::apply_patch(simulator.config(), &patch)
                .map_err(|err| err.to_string())
                .and_then(|next| {
                    simulator
                        .update_config(next)
                        .map_err(|err| err.to_string())
                });
            match result {
                Ok(()) => state.emit_state(events),
                Err(message) => emit(events, SimEvent::Error { message }),
            }
        }
        SimCommand::Inspect { x, y } => {
            let report = state
                .simulator
                .as_ref()
                .and_then(|simulator| simulator.inspect(x, y));
            emit(events, SimEvent::InspectResult { report });
        }
        SimCommand::SetSpeed { steps_per_frame } => {
            state.steps_per_frame = steps_per_frame.max(1);
        }
        SimCommand::Shutdown => return Flow::Exit,
    }
    Flow::Continue
}

/// Offer a state frame without blocking the worker. A full queue drops the
/// frame: snapshots are idempotent and a fresher one follows the next batch.
fn offer_frame(events: &EventSender, event: SimEvent) {
    match events.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => debug!("event queue full; dropping state frame"),
        Err(TrySendError::Disconnected(_)) => {}
    }
}

/// Deliver an event the host must not miss (generation completions,
/// inspect replies, errors). Retries while the queue is full and gives up
/// only once the host has disconnected.
fn emit(events: &EventSender, event: SimEvent) {
    let mut event = event;
    loop {
        match events.try_send(event) {
            Ok(()) => return,
            Err(TrySendError::Full(returned)) => {
                event = returned;
                thread::sleep(EMIT_RETRY_SLEEP);
            }
            Err(TrySendError::Disconnected(_)) => return,
        }
    }
}
