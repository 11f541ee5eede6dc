//! Per-question session state.
//!
//! The phase of a session is derived from its action list, never stored. The
//! step budget is enforced by the loop driver; this type only reports it.

use serde::Serialize;

use crate::graph::QueryResult;

use super::action::{Action, ActionKind};

/// Where a session is, derived from its actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    /// No actions yet.
    Empty,
    /// Some actions, last one not Stop, budget left.
    Active,
    /// The last action was Stop.
    StoppedByAction,
    /// The step budget has been used up.
    BudgetExhausted,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::StoppedByAction | Self::BudgetExhausted)
    }
}

/// Everything that happened while answering one question.
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    question: String,
    actions: Vec<Action>,
    query_results: Vec<QueryResult>,
    final_result: Option<QueryResult>,
    finished: bool,
    max_steps: usize,
    duplicate_window: usize,
}

impl SessionState {
    pub fn new(question: impl Into<String>, max_steps: usize, duplicate_window: usize) -> Self {
        Self {
            question: question.into(),
            actions: Vec::new(),
            query_results: Vec::new(),
            final_result: None,
            finished: false,
            max_steps,
            duplicate_window,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// One entry per executed query, failed ones included.
    pub fn query_results(&self) -> &[QueryResult] {
        &self.query_results
    }

    /// Set once the session has finished: the last query result, if any.
    pub fn final_result(&self) -> Option<&QueryResult> {
        self.final_result.as_ref()
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn duplicate_window(&self) -> usize {
        self.duplicate_window
    }

    pub fn step_count(&self) -> usize {
        self.actions.len()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn phase(&self) -> SessionPhase {
        // Budget first: a Stop landing on the last step still counts as exhausted budget.
        if self.actions.len() >= self.max_steps {
            return SessionPhase::BudgetExhausted;
        }
        match self.actions.last() {
            None => SessionPhase::Empty,
            Some(a) if a.kind() == ActionKind::Stop => SessionPhase::StoppedByAction,
            Some(_) => SessionPhase::Active,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.phase().is_terminal()
    }

    /// Whether `candidate` repeats (by kind and argument) one of the last
    /// `duplicate_window` actions.
    pub fn is_duplicate(&self, candidate: &Action) -> bool {
        let start = self.actions.len().saturating_sub(self.duplicate_window);
        self.actions[start..].iter().any(|a| a == candidate)
    }

    /// Render the last `last_n` actions for the decision-maker.
    ///
    /// Search and inspect observations are left out for all but the final two
    /// actions of the window.
    pub fn history_for_context(&self, last_n: usize, include_observation: bool) -> String {
        let start = self.actions.len().saturating_sub(last_n);
        let window = &self.actions[start..];
        window
            .iter()
            .enumerate()
            .map(|(i, action)| {
                let bulky = matches!(action.kind(), ActionKind::Search | ActionKind::Inspect);
                let recent = i + 2 >= window.len();
                action.render(include_observation && (recent || !bulky))
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub(crate) fn record(&mut self, action: Action, query_result: Option<QueryResult>) {
        self.actions.push(action);
        if let Some(result) = query_result {
            self.query_results.push(result);
        }
    }

    /// Fix `final_result` to the last query result. Later calls do nothing.
    pub(crate) fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.final_result = self.query_results.last().cloned();
    }
}
