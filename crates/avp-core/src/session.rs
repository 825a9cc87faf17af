//! Scoped ownership of the collaborator session handle.

use crate::provider::SessionProvider;

/// Owns the provider handle for the whole process lifetime.
///
/// Dispatch runs inside this guard; `Drop` releases the handle on every
/// exit path, normal or error, so the release happens exactly once no
/// matter which branch executed.
pub struct SessionContext {
    provider: Box<dyn SessionProvider>,
}

impl SessionContext {
    #[must_use]
    pub fn new(provider: Box<dyn SessionProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_mut(&mut self) -> &mut dyn SessionProvider {
        self.provider.as_mut()
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.provider.destroy();
    }
}
