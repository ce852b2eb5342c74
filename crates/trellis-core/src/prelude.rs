pub use crate::context::{Context, ContextValue, Subscribe, Unsubscribe, create_context};
pub use crate::effects::{Dispose, on_unmount, use_layout_effect};
pub use crate::error::{ContextError, HostError};
pub use crate::policy::{BuildMode, HostConfig};
pub use crate::runtime::{ForceUpdate, Host, child, child_always, remember, use_force_update};
pub use crate::same::Same;
pub use crate::selector::{try_use_context_selector, use_context_selector, use_context_value};
pub use crate::state_manager::{StateManagerOptions, StateManagerResult, use_state_manager};
