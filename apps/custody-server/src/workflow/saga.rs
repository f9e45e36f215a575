// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ordered compensable steps.
//!
//! A [`Saga`] runs its steps in order. When step N fails, the
//! compensations of steps `N-1..=1` run in reverse order before the failure
//! is returned. A failing compensation does not stop the remaining ones;
//! every compensation error is collected in [`SagaFailure`].

use tracing::{error, warn};

type StepFn<'a, E> = Box<dyn FnOnce() -> Result<(), E> + Send + 'a>;

struct Step<'a, E> {
    name: &'static str,
    action: StepFn<'a, E>,
    compensation: Option<StepFn<'a, E>>,
}

/// Why a saga stopped.
#[derive(Debug)]
pub struct SagaFailure<E> {
    /// Name of the step that failed.
    pub step: &'static str,
    pub step_index: usize,
    pub error: E,
    /// Compensations that themselves failed, by step name.
    pub compensation_errors: Vec<(&'static str, E)>,
}

impl<E> SagaFailure<E> {
    /// Whether every prior step was undone.
    pub fn fully_compensated(&self) -> bool {
        self.compensation_errors.is_empty()
    }
}

pub struct Saga<'a, E> {
    name: &'static str,
    steps: Vec<Step<'a, E>>,
}

impl<'a, E: std::fmt::Display> Saga<'a, E> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    /// A step with nothing to undo (usually the last one).
    pub fn step(
        mut self,
        name: &'static str,
        action: impl FnOnce() -> Result<(), E> + Send + 'a,
    ) -> Self {
        self.steps.push(Step {
            name,
            action: Box::new(action),
            compensation: None,
        });
        self
    }

    /// A step whose effect is undone by `compensation` if a later step fails.
    pub fn compensable(
        mut self,
        name: &'static str,
        action: impl FnOnce() -> Result<(), E> + Send + 'a,
        compensation: impl FnOnce() -> Result<(), E> + Send + 'a,
    ) -> Self {
        self.steps.push(Step {
            name,
            action: Box::new(action),
            compensation: Some(Box::new(compensation)),
        });
        self
    }

    pub fn run(self) -> Result<(), SagaFailure<E>> {
        let saga = self.name;
        let mut completed: Vec<(&'static str, Option<StepFn<'a, E>>)> = Vec::new();

        for (index, step) in self.steps.into_iter().enumerate() {
            if let Err(err) = (step.action)() {
                warn!(saga, step = step.name, error = %err, "Saga step failed, compensating");

                let mut compensation_errors = Vec::new();
                for (name, compensation) in completed.into_iter().rev() {
                    let Some(compensation) = compensation else {
                        continue;
                    };
                    if let Err(comp_err) = compensation() {
                        error!(
                            saga,
                            step = name,
                            error = %comp_err,
                            "Compensation failed, manual investigation required"
                        );
                        compensation_errors.push((name, comp_err));
                    }
                }

                return Err(SagaFailure {
                    step: step.name,
                    step_index: index,
                    error: err,
                    compensation_errors,
                });
            }
            completed.push((step.name, step.compensation));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn record<'a>(log: &'a Mutex<Vec<String>>, entry: &'a str) -> impl FnOnce() -> Result<(), String> + Send + 'a {
        move || {
            log.lock().unwrap().push(entry.to_string());
            Ok(())
        }
    }

    fn fail<'a>(log: &'a Mutex<Vec<String>>, entry: &'a str) -> impl FnOnce() -> Result<(), String> + Send + 'a {
        move || {
            log.lock().unwrap().push(entry.to_string());
            Err(format!("{entry} failed"))
        }
    }

    #[test]
    fn all_steps_run_in_order() {
        let log = Mutex::new(Vec::new());
        Saga::new("test")
            .compensable("a", record(&log, "a"), record(&log, "undo a"))
            .step("b", record(&log, "b"))
            .run()
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn failure_compensates_prior_steps_in_reverse() {
        let log = Mutex::new(Vec::new());
        let failure = Saga::new("test")
            .compensable("a", record(&log, "a"), record(&log, "undo a"))
            .compensable("b", record(&log, "b"), record(&log, "undo b"))
            .compensable("c", fail(&log, "c"), record(&log, "undo c"))
            .run()
            .unwrap_err();

        assert_eq!(failure.step, "c");
        assert_eq!(failure.step_index, 2);
        assert!(failure.fully_compensated());
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c", "undo b", "undo a"]);
    }

    #[test]
    fn first_step_failure_runs_no_compensation() {
        let log = Mutex::new(Vec::new());
        let failure = Saga::new("test")
            .compensable("a", fail(&log, "a"), record(&log, "undo a"))
            .run()
            .unwrap_err();
        assert_eq!(failure.step_index, 0);
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }

    #[test]
    fn failed_compensation_is_reported_and_others_still_run() {
        let log = Mutex::new(Vec::new());
        let failure = Saga::new("test")
            .compensable("a", record(&log, "a"), record(&log, "undo a"))
            .compensable("b", record(&log, "b"), fail(&log, "undo b"))
            .step("c", fail(&log, "c"))
            .run()
            .unwrap_err();

        assert!(!failure.fully_compensated());
        assert_eq!(failure.compensation_errors.len(), 1);
        assert_eq!(failure.compensation_errors[0].0, "b");
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c", "undo b", "undo a"]);
    }
}
