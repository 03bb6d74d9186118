use std::{
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard},
};

use crate::models::{ConnectionStatus, DiagramCandidate, RecognizedPosition, SetPositionResult};

const ENABLE_LOGS: bool = true;

use crate::log_error;

/// Receives workflow notifications. Every callback defaults to a no-op.
///
/// Callbacks run on the controller's task, so they should hand work off rather than block.
pub trait WorkflowObserver: Send + Sync {
    fn on_connection_status_changed(&self, _status: ConnectionStatus) {}

    fn on_position_recognized(&self, _position: &RecognizedPosition) {}

    fn on_active_diagram_changed(&self, _candidate: Option<&DiagramCandidate>) {}

    fn on_position_sent(&self, _result: &SetPositionResult) {}

    fn on_error(&self, _message: &str) {}
}

/// Ordered, de-duplicated set of observers. A panicking observer is logged and skipped;
/// the rest still run.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Mutex<Vec<Arc<dyn WorkflowObserver>>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<dyn WorkflowObserver>>> {
        match self.observers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Returns `false` when the observer was already registered.
    pub fn add(&self, observer: Arc<dyn WorkflowObserver>) -> bool {
        let mut observers = self.lock();
        if observers.iter().any(|existing| same_observer(existing, &observer)) {
            return false;
        }
        observers.push(observer);
        true
    }

    pub fn remove(&self, observer: &Arc<dyn WorkflowObserver>) -> bool {
        let mut observers = self.lock();
        let before = observers.len();
        observers.retain(|existing| !same_observer(existing, observer));
        observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn connection_status_changed(&self, status: ConnectionStatus) {
        self.dispatch("on_connection_status_changed", |observer| {
            observer.on_connection_status_changed(status)
        });
    }

    pub fn position_recognized(&self, position: &RecognizedPosition) {
        self.dispatch("on_position_recognized", |observer| {
            observer.on_position_recognized(position)
        });
    }

    pub fn active_diagram_changed(&self, candidate: Option<&DiagramCandidate>) {
        self.dispatch("on_active_diagram_changed", |observer| {
            observer.on_active_diagram_changed(candidate)
        });
    }

    pub fn position_sent(&self, result: &SetPositionResult) {
        self.dispatch("on_position_sent", |observer| observer.on_position_sent(result));
    }

    pub fn error(&self, message: &str) {
        self.dispatch("on_error", |observer| observer.on_error(message));
    }

    fn dispatch<F>(&self, callback: &str, notify: F)
    where
        F: Fn(&dyn WorkflowObserver),
    {
        // Snapshot so observers may (un)register from inside a callback.
        let observers: Vec<_> = self.lock().clone();
        for observer in observers {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| notify(observer.as_ref())));
            if let Err(payload) = outcome {
                log_error!("Observer error in {callback}: {}", panic_message(&payload));
            }
        }
    }
}

fn same_observer(a: &Arc<dyn WorkflowObserver>, b: &Arc<dyn WorkflowObserver>) -> bool {
    // Data pointers only; vtable pointers are not guaranteed unique.
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        name: &'static str,
        calls: Mutex<Vec<String>>,
        shared: Option<Arc<Mutex<Vec<&'static str>>>>,
    }

    impl WorkflowObserver for Recorder {
        fn on_error(&self, message: &str) {
            self.calls.lock().unwrap().push(message.to_string());
            if let Some(shared) = &self.shared {
                shared.lock().unwrap().push(self.name);
            }
        }
    }

    struct Panicker;

    impl WorkflowObserver for Panicker {
        fn on_error(&self, _message: &str) {
            panic!("listener exploded");
        }
    }

    #[test]
    fn duplicate_registration_is_ignored() {
        let registry = ObserverRegistry::new();
        let observer: Arc<dyn WorkflowObserver> = Arc::new(Recorder::default());

        assert!(registry.add(observer.clone()));
        assert!(!registry.add(observer.clone()));
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(&observer));
        assert!(!registry.remove(&observer));
        assert!(registry.is_empty());
    }

    #[test]
    fn fan_out_follows_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let registry = ObserverRegistry::new();
        for name in ["first", "second", "third"] {
            registry.add(Arc::new(Recorder {
                name,
                shared: Some(order.clone()),
                ..Default::default()
            }));
        }

        registry.error("boom");

        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn panicking_observer_does_not_break_fan_out() {
        let registry = ObserverRegistry::new();
        let before = Arc::new(Recorder::default());
        let after = Arc::new(Recorder::default());

        registry.add(before.clone());
        registry.add(Arc::new(Panicker));
        registry.add(after.clone());

        registry.error("recognition failed");
        registry.error("second");

        assert_eq!(before.calls.lock().unwrap().len(), 2);
        assert_eq!(
            *after.calls.lock().unwrap(),
            vec!["recognition failed".to_string(), "second".to_string()]
        );
    }
}
