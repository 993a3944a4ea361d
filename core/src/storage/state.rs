use anyhow::Result;

use crate::settlement::{BatchCommitted, RollupState};
use crate::state::Ledger;

/// Durable home of the gate's state.
///
/// `persist` must write the state, the optional batch record and the optional
/// post-batch ledger as one atomic unit: after a crash either all of them are
/// visible or none is.
pub trait GateStore: Send + Sync {
    /// Last persisted state, `None` before genesis
    fn load(&self) -> Result<Option<RollupState>>;

    fn persist(
        &self,
        state: &RollupState,
        record: Option<&BatchCommitted>,
        ledger: Option<&Ledger>,
    ) -> Result<()>;
}
