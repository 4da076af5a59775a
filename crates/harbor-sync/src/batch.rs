use harbor_types::actions::{ActionBatch, StateAction};

/// Receives whole batches. Implementations must apply a batch as a single
/// state transition.
pub trait ActionSink: Send + Sync {
    fn dispatch(&self, batch: ActionBatch);
}

/// Primary post delivery first, then whatever dependency resolution produced.
pub fn batch_actions(primary: Vec<StateAction>, dependencies: Vec<StateAction>) -> ActionBatch {
    let mut actions = primary;
    actions.extend(dependencies);
    ActionBatch { actions }
}
