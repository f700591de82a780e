//! Message types and bounded channels between the host and the simulation
//! worker.

use crossfire::{detect_backoff_cfg, mpmc, MAsyncTx, MRx};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use gridlife_core::{GenerationStats, InspectReport, SimConfig, StateSnapshot};

/// Commands accepted by the simulation worker, processed FIFO strictly
/// between steps.
#[derive(Debug, Clone)]
pub enum SimCommand {
    /// Construct and initialize with the given parameters.
    Init { params: SimConfig },
    /// Tear down and rebuild; `None` reuses the current parameters.
    Reset { params: Option<SimConfig> },
    /// Begin free-running steps.
    Start,
    Pause,
    Resume,
    /// Advance exactly one simulation step.
    Step,
    /// Advance to the next generation boundary.
    StepGeneration,
    /// Merge a partial JSON object onto the current configuration.
    /// Structural changes (grid, barriers, signal layers) are refused.
    UpdateParams { patch: Value },
    /// Request details for the agent at `(x, y)`.
    Inspect { x: i32, y: i32 },
    /// Steps executed per free-running batch, clamped to at least 1.
    SetSpeed { steps_per_frame: u32 },
    /// Stop the worker thread.
    Shutdown,
}

/// Events emitted by the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SimEvent {
    /// Full renderable snapshot plus scheduler flags.
    State {
        snapshot: StateSnapshot,
        running: bool,
        paused: bool,
    },
    /// Emitted on every generation boundary.
    GenerationComplete { stats: GenerationStats },
    /// Reply to one `Inspect`; `None` when the cell holds no agent.
    InspectResult { report: Option<InspectReport> },
    /// Any internal failure; previous state is kept where possible.
    Error { message: String },
}

pub type CommandSender = MAsyncTx<SimCommand>;
pub type CommandReceiver = MRx<SimCommand>;
pub type EventSender = MAsyncTx<SimEvent>;
pub type EventReceiver = MRx<SimEvent>;

pub fn create_command_bus(capacity: usize) -> (CommandSender, CommandReceiver) {
    detect_backoff_cfg();
    mpmc::bounded_tx_async_rx_blocking(capacity)
}

pub fn create_event_bus(capacity: usize) -> (EventSender, EventReceiver) {
    detect_backoff_cfg();
    mpmc::bounded_tx_async_rx_blocking(capacity)
}
