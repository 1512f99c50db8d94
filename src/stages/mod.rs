//! The stock stage library: the concrete receivers, transformations, and
//! dispatchers shipped with this daemon. None of this is part of the core
//! (registry + executor + config + binding) — it is an external
//! collaborator that happens to live in-tree so the binary is useful out
//! of the box, registered the same way a third-party crate would register
//! its own schemes.

pub mod dispatchers;
pub mod receivers;
pub mod transformations;

use crate::registry::{ConfigError, Registry};

/// Register every stock scheme with `registry`. Mirrors the `init()`-time
/// self-registration of the reference implementation's stage packages,
/// but as an explicit, testable call rather than a module-load side effect.
pub fn register_defaults(registry: &mut Registry) -> Result<(), ConfigError> {
    registry.register_receiver("passthrough", receivers::passthrough::new)?;
    registry.register_receiver("secure", receivers::secure::new)?;

    registry.register_transformation("pass", transformations::pass::new)?;
    registry.register_transformation("azure-alert", transformations::azure_alert::new)?;

    registry.register_dispatcher("echo", dispatchers::echo::new)?;
    registry.register_dispatcher("slack", dispatchers::slack::new)?;
    registry.register_dispatcher("log", dispatchers::log::new)?;

    Ok(())
}
