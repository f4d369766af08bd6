//! Built-in selection steps, in the order the default selector runs them.

mod behavior;
mod category_ids;
mod cutflow;
mod process_ids;
mod trigger;

pub use behavior::AttachBehavior;
pub use category_ids::CategoryIds;
pub use cutflow::CutflowFeatures;
pub use process_ids::ProcessIds;
pub use trigger::{TRIGGER_STEP, TriggerSelection};
