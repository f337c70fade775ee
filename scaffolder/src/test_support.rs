//! Test-only helpers for building actions, contexts and event recorders.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tempfile::TempDir;

use crate::action::Action;
use crate::context::Context;
use crate::io::config::RunOptions;
use crate::output::{OutputCollection, OutputEvent, OutputEventKind};

static ACTION_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Create an action with a unique name and no hooks.
pub fn named_action() -> Action {
    let number = ACTION_COUNTER.fetch_add(1, Ordering::SeqCst) + 1;
    Action::new(format!("test-action-{number}"))
        .with_description(format!("test action ({number})"))
}

/// Options for tests: change tracking on, output under the temp dir.
pub fn test_options() -> RunOptions {
    RunOptions {
        log_changes: true,
        ..RunOptions::default()
    }
}

/// Root context rooted in a fresh temp dir. Keep the `TempDir` alive for the test.
pub fn test_context() -> (TempDir, Context) {
    test_context_with(test_options())
}

/// Root context in a fresh temp dir with explicit options.
pub fn test_context_with(options: RunOptions) -> (TempDir, Context) {
    let temp = tempfile::tempdir().expect("tempdir");
    let ctx = Context::root_in(temp.path(), options).expect("context");
    (temp, ctx)
}

/// Records every event published by a collection.
#[derive(Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<OutputEvent>>>,
}

impl EventRecorder {
    /// Subscribe a new recorder to every event kind of `files`.
    pub fn attach(files: &OutputCollection) -> Self {
        let recorder = Self::default();
        let sink = Arc::clone(&recorder.events);
        files.on_any(move |event| sink.lock().push(event.clone()));
        recorder
    }

    pub fn events(&self) -> Vec<OutputEvent> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<OutputEventKind> {
        self.events.lock().iter().map(OutputEvent::kind).collect()
    }

    pub fn count(&self, kind: OutputEventKind) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.kind() == kind)
            .count()
    }
}
