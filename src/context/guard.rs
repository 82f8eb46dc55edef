use super::PersistenceContext;
use std::ops::{Deref, DerefMut};

/// Suspends automatic change detection on a context for the guard's lifetime.
///
/// The setting observed at construction is written back on drop, which also
/// runs when the guarded work returns an error or unwinds.
pub struct ChangeTrackingGuard<'a, C: PersistenceContext + ?Sized> {
    context: &'a mut C,
    previous: bool,
}

impl<'a, C: PersistenceContext + ?Sized> ChangeTrackingGuard<'a, C> {
    pub fn suspend(context: &'a mut C) -> Self {
        let previous = context.auto_detect_changes_enabled();
        context.set_auto_detect_changes_enabled(false);
        Self { context, previous }
    }

    /// Setting that will be restored on drop.
    pub fn previous(&self) -> bool {
        self.previous
    }
}

impl<C: PersistenceContext + ?Sized> Deref for ChangeTrackingGuard<'_, C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        self.context
    }
}

impl<C: PersistenceContext + ?Sized> DerefMut for ChangeTrackingGuard<'_, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.context
    }
}

impl<C: PersistenceContext + ?Sized> Drop for ChangeTrackingGuard<'_, C> {
    fn drop(&mut self) {
        self.context.set_auto_detect_changes_enabled(self.previous);
    }
}
