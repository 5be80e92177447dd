//! Routes UI actions to the active module.
//!
//! The originating control stays disabled for as long as its step sequence
//! runs and is re-enabled exactly once when the sequence settles, whatever
//! the outcome.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use tokio::{sync::oneshot, task::JoinSet};

use crate::{
    host::ModuleHost,
    modules::{ActionRequest, CapabilitySet, StepDirection, StepOutcome},
    notice::NoticeLog,
    scene::ClickBinding,
    ArcadeError, Result,
};

pub const PREV_STEP: &str = "prev-step";
pub const NEXT_STEP: &str = "next-step";
pub const LOAD_MODULE: &str = "load-module";

/// Identifies a UI control (a button, a slider, the scene itself).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId(String);

impl ControlId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Control used for clicks on scene objects.
    pub fn scene_pick() -> Self {
        Self::new("scene-pick")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlState {
    pub disabled: bool,
    pub disables: u32,
    pub enables: u32,
}

/// Enabled/disabled state of every control the dispatcher has touched.
/// Controls it has never seen are enabled.
#[derive(Clone, Default)]
pub struct ControlPanel {
    states: Arc<Mutex<HashMap<ControlId, ControlState>>>,
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disable(&self, control: &ControlId) {
        let mut states = self.lock();
        let state = states.entry(control.clone()).or_default();
        state.disabled = true;
        state.disables += 1;
    }

    pub fn enable(&self, control: &ControlId) {
        let mut states = self.lock();
        let state = states.entry(control.clone()).or_default();
        state.disabled = false;
        state.enables += 1;
    }

    pub fn is_enabled(&self, control: &ControlId) -> bool {
        self.state(control).map_or(true, |state| !state.disabled)
    }

    pub fn state(&self, control: &ControlId) -> Option<ControlState> {
        self.lock().get(control).copied()
    }

    // Control bookkeeping must survive a panicking step sequence, so a
    // poisoned map is recovered rather than reported.
    fn lock(&self) -> MutexGuard<'_, HashMap<ControlId, ControlState>> {
        self.states
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for ControlPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.lock().iter()).finish()
    }
}

/// Re-enables its control when dropped, including on panic or abort.
struct ReenableGuard {
    panel: ControlPanel,
    control: ControlId,
}

impl Drop for ReenableGuard {
    fn drop(&mut self) {
        self.panel.enable(&self.control);
    }
}

/// How a dispatched action settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
    Failed(String),
    Unrecognized,
    Switched,
    /// The control was still disabled by an earlier action; nothing ran.
    Busy,
}

/// Handle on a dispatched action.
#[derive(Debug)]
pub struct ActionTicket {
    outcome: TicketState,
}

#[derive(Debug)]
enum TicketState {
    Ready(Outcome),
    Pending(oneshot::Receiver<Outcome>),
}

impl ActionTicket {
    fn ready(outcome: Outcome) -> Self {
        Self {
            outcome: TicketState::Ready(outcome),
        }
    }

    /// Waits for the action to settle.
    pub async fn settled(self) -> Outcome {
        match self.outcome {
            TicketState::Ready(outcome) => outcome,
            TicketState::Pending(receiver) => receiver
                .await
                .unwrap_or_else(|_| Outcome::Failed("action task was dropped".into())),
        }
    }
}

/// Routes actions to the active module. Must be used from within a tokio
/// runtime; operations run as tasks.
pub struct ActionDispatcher {
    host: ModuleHost,
    table: CapabilitySet,
    controls: ControlPanel,
    notices: NoticeLog,
    tasks: JoinSet<()>,
}

impl ActionDispatcher {
    pub fn new(host: ModuleHost) -> Self {
        let notices = host.services().notices.clone();
        Self {
            host,
            table: CapabilitySet::new(),
            controls: ControlPanel::new(),
            notices,
            tasks: JoinSet::new(),
        }
    }

    /// Switches the active module and rebuilds the dispatch table.
    pub fn load(&mut self, id: &str) -> Result<()> {
        self.table = self.host.select(id)?;
        Ok(())
    }

    pub fn dispatch(
        &mut self,
        action: &str,
        origin: ControlId,
        aux: Option<String>,
    ) -> Result<ActionTicket> {
        self.reap();
        if !self.controls.is_enabled(&origin) {
            tracing::debug!(action, control = %origin, "control busy, action refused");
            return Ok(ActionTicket::ready(Outcome::Busy));
        }
        self.controls.disable(&origin);
        let guard = ReenableGuard {
            panel: self.controls.clone(),
            control: origin.clone(),
        };
        tracing::debug!(action, control = %origin, ?aux, "dispatching action");

        match action {
            LOAD_MODULE => {
                let result = match aux {
                    Some(id) => self.load(&id).map(|_| ActionTicket::ready(Outcome::Switched)),
                    None => {
                        self.notices
                            .warning("Action \"load-module\" is missing a module identifier.");
                        Ok(ActionTicket::ready(Outcome::Unrecognized))
                    }
                };
                drop(guard);
                return result;
            }
            PREV_STEP | NEXT_STEP => {
                let direction = if action == NEXT_STEP {
                    StepDirection::Next
                } else {
                    StepDirection::Previous
                };
                let outcome = self.host.active().and_then(|module| module.step(direction));
                let result = match outcome {
                    Some(StepOutcome::Stay) => Ok(ActionTicket::ready(Outcome::Completed)),
                    Some(StepOutcome::Load(id)) => {
                        self.load(&id).map(|_| ActionTicket::ready(Outcome::Switched))
                    }
                    None => Ok(self.unrecognized(action)),
                };
                drop(guard);
                return result;
            }
            _ => {}
        }

        let Some(operation) = self.table.resolve(action) else {
            drop(guard);
            return Ok(self.unrecognized(action));
        };

        let step = operation(ActionRequest::new(origin, aux));
        let notices = self.notices.clone();
        let name = action.to_string();
        let (sender, receiver) = oneshot::channel();

        self.tasks.spawn(async move {
            let reenable = guard;
            let outcome = match step.await {
                Ok(()) => Outcome::Completed,
                Err(ArcadeError::Cancelled) => {
                    tracing::debug!(action = %name, "action cancelled");
                    Outcome::Cancelled
                }
                Err(err) => {
                    notices.error(format!("Action \"{name}\" failed: {err}"));
                    Outcome::Failed(err.to_string())
                }
            };
            drop(reenable);
            let _ = sender.send(outcome);
        });

        Ok(ActionTicket {
            outcome: TicketState::Pending(receiver),
        })
    }

    /// Dispatches the binding of a clicked scene object.
    pub fn click(&mut self, binding: ClickBinding) -> Result<ActionTicket> {
        self.dispatch(&binding.action, ControlId::scene_pick(), binding.aux)
    }

    /// Updates the global animation speed.
    pub fn set_speed(&self, value: f64) -> Result<()> {
        self.host.services().speed.set(value)?;
        self.notices.info(format!("Speed set to {value}x"));
        Ok(())
    }

    /// Waits until every dispatched action and the module intro have settled.
    pub async fn settle(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(err) = joined {
                tracing::warn!(%err, "action task did not finish cleanly");
            }
        }
        self.host.settle().await;
    }

    pub fn controls(&self) -> &ControlPanel {
        &self.controls
    }

    pub fn host(&self) -> &ModuleHost {
        &self.host
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.table
    }

    pub fn notices(&self) -> &NoticeLog {
        &self.notices
    }

    /// Tears down the active module and clears the scene.
    pub fn shutdown(&mut self) -> Result<()> {
        self.table = CapabilitySet::new();
        self.host.shutdown()
    }

    fn unrecognized(&self, action: &str) -> ActionTicket {
        self.notices.warning(format!(
            "Action \"{action}\" not recognized or not implemented in current module."
        ));
        ActionTicket::ready(Outcome::Unrecognized)
    }

    fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            if let Err(err) = joined {
                tracing::warn!(%err, "action task did not finish cleanly");
            }
        }
    }
}

impl fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDispatcher")
            .field("active", &self.host.active_id())
            .field("capabilities", &self.table)
            .field("pending", &self.tasks.len())
            .finish()
    }
}
