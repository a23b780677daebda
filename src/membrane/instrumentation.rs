//! Optional observation of environment activity.

use std::cell::RefCell;
use std::time::Instant;

use tracing::{debug, warn};

use crate::runner::ds::error::JErrorType;

/// Hooks an embedder can install to time or trace what an environment does. Purely
/// observational: nothing returned here affects the membrane.
pub trait Instrumentation {
    fn start_activity(&self, name: &'static str);

    fn stop_activity(&self, name: &'static str);

    fn error(&self, name: &'static str, error: &JErrorType) {
        let _ = (name, error);
    }
}

/// Logs every activity with its duration through `tracing`.
#[derive(Default)]
pub struct TracingInstrumentation {
    started: RefCell<Vec<(&'static str, Instant)>>,
}
impl TracingInstrumentation {
    pub fn new() -> Self {
        Self::default()
    }
}
impl Instrumentation for TracingInstrumentation {
    fn start_activity(&self, name: &'static str) {
        debug!(activity = name, "Activity started");
        self.started.borrow_mut().push((name, Instant::now()));
    }

    fn stop_activity(&self, name: &'static str) {
        let started = {
            let mut started = self.started.borrow_mut();
            let position = started.iter().rposition(|(n, _)| *n == name);
            position.map(|p| started.remove(p).1)
        };
        match started {
            Some(at) => debug!(
                activity = name,
                elapsed_us = at.elapsed().as_micros() as u64,
                "Activity finished"
            ),
            None => debug!(activity = name, "Activity finished without a start"),
        }
    }

    fn error(&self, name: &'static str, error: &JErrorType) {
        warn!(activity = name, "Activity failed: {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_activities_pair_up() {
        let instrumentation = TracingInstrumentation::new();
        instrumentation.start_activity("evaluate");
        instrumentation.start_activity("remap");
        instrumentation.stop_activity("evaluate");
        assert_eq!(instrumentation.started.borrow().len(), 1);
        assert_eq!(instrumentation.started.borrow()[0].0, "remap");
        instrumentation.stop_activity("remap");
        instrumentation.stop_activity("remap");
        assert!(instrumentation.started.borrow().is_empty());
    }
}
