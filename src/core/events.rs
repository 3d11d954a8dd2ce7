// ─── Change Notifications ───
// List-shaped models (meta indexes, version lists, the patch stack) report
// their changes through this observer interface. UI adapters subscribe.

use std::fmt;
use std::sync::Arc;

/// Which part of a row changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeRole {
    Name,
    Type,
    Time,
    Requires,
    Recommended,
    Latest,
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// The whole list was replaced.
    Reset,
    /// Rows `first..=last` were inserted.
    Inserted { first: usize, last: usize },
    DataChanged { row: usize, roles: Vec<ChangeRole> },
    NameChanged(String),
}

pub trait ChangeListener: Send + Sync {
    fn on_change(&self, event: &ChangeEvent);
}

/// Fan-out of change events to every subscribed listener.
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    listeners: Vec<Arc<dyn ChangeListener>>,
}

impl ChangeNotifier {
    pub fn subscribe(&mut self, listener: Arc<dyn ChangeListener>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: ChangeEvent) {
        for listener in &self.listeners {
            listener.on_change(&event);
        }
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
