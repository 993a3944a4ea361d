use serde::{Deserialize, Serialize};

use rollup_account::Identity;
use rollup_field::FieldElement;

/// Emitted by the gate after a state change has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum GateEvent {
    #[serde(rename_all = "camelCase")]
    BatchVerified {
        batch_id: u64,
        old_root: FieldElement,
        new_root: FieldElement,
        submitter: Identity,
        /// Unix seconds
        timestamp: i64,
    },
    OperatorChanged { old: Identity, new: Identity },
}
