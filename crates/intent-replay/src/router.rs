//! Navigation seam.

use crate::IntentResult;

/// Navigation surface the gate and replay coordinator drive.
///
/// Implemented by the mobile shell's router. `replace` swaps the current
/// history entry so Back does not land the user on a transient screen
/// such as the sign-in page.
pub trait Router: Send + Sync {
    fn push(&self, path: &str) -> IntentResult<()>;
    fn replace(&self, path: &str) -> IntentResult<()>;
}
