//! Typed publish/subscribe channel for output collection events.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Topic an [`OutputEvent`] is published under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputEventKind {
    FileStacked,
    WriteStart,
    FileWritten,
    FileError,
    WriteDone,
}

impl OutputEventKind {
    pub const ALL: [OutputEventKind; 5] = [
        OutputEventKind::FileStacked,
        OutputEventKind::WriteStart,
        OutputEventKind::FileWritten,
        OutputEventKind::FileError,
        OutputEventKind::WriteDone,
    ];

    /// Stable topic name, e.g. `write:file-written`.
    pub fn as_str(self) -> &'static str {
        match self {
            OutputEventKind::FileStacked => "file:stacked",
            OutputEventKind::WriteStart => "write:start",
            OutputEventKind::FileWritten => "write:file-written",
            OutputEventKind::FileError => "write:file-error",
            OutputEventKind::WriteDone => "write:done",
        }
    }
}

/// Notification published by an output collection.
#[derive(Debug, Clone)]
pub enum OutputEvent {
    /// A file was staged in memory.
    FileStacked {
        path: String,
        origin: Option<String>,
        contents: String,
    },
    /// A flush is about to process `total` files.
    WriteStart { index: usize, total: usize },
    /// File number `index` of `total` was persisted (or would have been, in a dry run).
    FileWritten {
        path: PathBuf,
        index: usize,
        total: usize,
    },
    /// File number `index` of `total` could not be persisted.
    FileError {
        path: PathBuf,
        index: usize,
        total: usize,
        error: Arc<anyhow::Error>,
    },
    /// A flush finished; `index` is the number of files processed.
    WriteDone { index: usize, total: usize },
}

impl OutputEvent {
    pub fn kind(&self) -> OutputEventKind {
        match self {
            OutputEvent::FileStacked { .. } => OutputEventKind::FileStacked,
            OutputEvent::WriteStart { .. } => OutputEventKind::WriteStart,
            OutputEvent::FileWritten { .. } => OutputEventKind::FileWritten,
            OutputEvent::FileError { .. } => OutputEventKind::FileError,
            OutputEvent::WriteDone { .. } => OutputEventKind::WriteDone,
        }
    }
}

/// Callback invoked with each event of a subscribed topic.
pub type Listener = Arc<dyn Fn(&OutputEvent) + Send + Sync>;

/// Handle returned by a subscription; pass it to `off` to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    once: bool,
    listener: Listener,
}

/// Topic → listener registry.
///
/// The bus only hands out listeners; callers invoke them after releasing any
/// lock they hold, so a listener may safely read the collection it observes.
#[derive(Default)]
pub(crate) struct EventBus {
    topics: HashMap<OutputEventKind, Vec<Subscription>>,
    wildcard: Vec<Subscription>,
    next_id: u64,
}

impl EventBus {
    /// Register `listener` for `kind`, or for every kind when `kind` is `None`.
    pub(crate) fn subscribe(
        &mut self,
        kind: Option<OutputEventKind>,
        listener: Listener,
        once: bool,
    ) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        let subscription = Subscription { id, once, listener };
        match kind {
            Some(kind) => self.topics.entry(kind).or_default().push(subscription),
            None => self.wildcard.push(subscription),
        }
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let mut removed = false;
        for list in self.topics.values_mut().chain(std::iter::once(&mut self.wildcard)) {
            let before = list.len();
            list.retain(|sub| sub.id != id);
            removed |= list.len() != before;
        }
        removed
    }

    /// Listeners due for `kind`, in subscription order (topic first, then wildcard).
    ///
    /// One-shot subscriptions are removed as they are handed out.
    pub(crate) fn take_listeners(&mut self, kind: OutputEventKind) -> Vec<Listener> {
        let mut due = Vec::new();
        if let Some(list) = self.topics.get_mut(&kind) {
            drain_due(list, &mut due);
        }
        drain_due(&mut self.wildcard, &mut due);
        due
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self, kind: OutputEventKind) -> usize {
        self.topics.get(&kind).map_or(0, Vec::len) + self.wildcard.len()
    }
}

fn drain_due(list: &mut Vec<Subscription>, due: &mut Vec<Listener>) {
    due.extend(list.iter().map(|sub| Arc::clone(&sub.listener)));
    list.retain(|sub| !sub.once);
}
