use super::types::{Component, ComponentState};
use super::KioskOrchestrator;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

/// Last known state of each registered component
#[derive(Debug, Default)]
pub struct ComponentStates {
    states: Mutex<HashMap<Component, ComponentState>>,
}

impl ComponentStates {
    /// Track `component`, starting out stopped
    pub fn register(&self, component: Component) {
        self.states
            .lock()
            .entry(component)
            .or_insert(ComponentState::Stopped);
    }

    pub fn set(&self, component: Component, state: ComponentState) {
        let previous = self.states.lock().insert(component, state);
        if previous != Some(state) {
            debug!("{} component: {:?} -> {:?}", component, previous, state);
        }
    }

    pub fn get(&self, component: Component) -> Option<ComponentState> {
        self.states.lock().get(&component).copied()
    }
}

impl KioskOrchestrator {
    /// State of a registered component, `None` before `initialize`
    pub fn component_state(&self, component: Component) -> Option<ComponentState> {
        self.component_states.get(component)
    }
}
