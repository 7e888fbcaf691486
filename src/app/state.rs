use super::{CamflowOrchestrator, ComponentState};
use std::collections::HashMap;
use tracing::debug;

impl CamflowOrchestrator {
    pub async fn set_component_state(&self, component: &str, state: ComponentState) {
        let mut states = self.component_states.lock().await;
        match states.insert(component.to_string(), state) {
            Some(previous) if previous != state => {
                debug!("Component '{}': {} -> {}", component, previous, state)
            }
            Some(_) => {}
            None => debug!("Component '{}' registered as {}", component, state),
        }
    }

    pub async fn get_component_state(&self, component: &str) -> Option<ComponentState> {
        self.component_states.lock().await.get(component).copied()
    }

    pub async fn get_all_component_states(&self) -> HashMap<String, ComponentState> {
        self.component_states.lock().await.clone()
    }

    /// Components that ended in `Failed`, sorted by name
    pub async fn failed_components(&self) -> Vec<String> {
        let states = self.component_states.lock().await;
        let mut failed: Vec<String> = states
            .iter()
            .filter(|(_, state)| **state == ComponentState::Failed)
            .map(|(name, _)| name.clone())
            .collect();
        failed.sort();
        failed
    }
}
