//! The think-act-observe loop.

use crate::graph::{GraphBackend, QueryResult};

use super::AgentConfig;
use super::action::{Action, ActionKind};
use super::controller::{DecisionContext, DecisionMaker};
use super::error::AgentResult;
use super::executor::ActionExecutor;
use super::state::SessionState;

/// Rationale of the Stop substituted for a repeated action.
pub const DUPLICATE_STOP_RATIONALE: &str = "duplicate detected, stopping";

/// What one call to [`LoopDriver::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    /// Zero-based index of the recorded action.
    pub index: usize,
    pub kind: ActionKind,
    /// The decision-maker repeated itself and a Stop was recorded instead.
    pub forced_stop: bool,
    /// The step produced a query result.
    pub produced_query: bool,
    /// The session is now terminal.
    pub finished: bool,
}

/// Drives sessions: asks the decision-maker, guards against repeats, executes,
/// records, until Stop or the step budget.
///
/// The driver keeps no per-session data, so one driver can run many questions
/// in turn.
#[derive(Debug)]
pub struct LoopDriver<D, G> {
    decision_maker: D,
    executor: ActionExecutor<G>,
    config: AgentConfig,
}

impl<D: DecisionMaker, G: GraphBackend> LoopDriver<D, G> {
    pub fn new(decision_maker: D, graph: G, config: AgentConfig) -> Self {
        let executor = ActionExecutor::new(graph, &config);
        Self {
            decision_maker,
            executor,
            config,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn executor(&self) -> &ActionExecutor<G> {
        &self.executor
    }

    pub fn decision_maker(&self) -> &D {
        &self.decision_maker
    }

    /// A fresh session for `question` using this driver's budget and window.
    pub fn new_session(&self, question: impl Into<String>) -> SessionState {
        SessionState::new(question, self.config.max_steps, self.config.duplicate_window)
    }

    /// Run one step. Returns `Ok(None)` without doing anything if the session
    /// is already terminal.
    ///
    /// A decision-maker error leaves `state` untouched and is returned as is.
    /// When the step makes the session terminal, its final result is fixed.
    pub fn step(&mut self, state: &mut SessionState) -> AgentResult<Option<StepOutcome>> {
        if state.is_terminated() {
            state.finish();
            return Ok(None);
        }

        let index = state.step_count();
        let history = state.history_for_context(self.config.history_last_n, true);
        let context = DecisionContext {
            question: state.question(),
            history: &history,
            step: index,
        };
        let mut candidate = self.decision_maker.next_action(&context)?;

        let forced_stop = state.is_duplicate(&candidate);
        if forced_stop {
            tracing::warn!(
                step = index,
                kind = %candidate.kind(),
                argument = candidate.argument(),
                "duplicate action, forcing stop"
            );
            candidate = Action::stop(DUPLICATE_STOP_RATIONALE);
        }

        let kind = candidate.kind();
        tracing::info!(
            step = index,
            kind = %kind,
            decision_maker = self.decision_maker.name(),
            "executing action"
        );
        let (executed, query_result) = self.executor.execute(candidate);
        let produced_query = query_result.is_some();
        state.record(executed, query_result);

        let finished = state.is_terminated();
        if finished {
            state.finish();
            tracing::info!(
                steps = state.step_count(),
                phase = ?state.phase(),
                queries = state.query_results().len(),
                "session finished"
            );
        }

        Ok(Some(StepOutcome {
            index,
            kind,
            forced_stop,
            produced_query,
            finished,
        }))
    }

    /// Step until `state` is terminal.
    ///
    /// On error the partial state stays inspectable; its final result is not set.
    pub fn run_with_state(&mut self, state: &mut SessionState) -> AgentResult<()> {
        while self.step(state)?.is_some() {}
        Ok(())
    }

    /// Answer `question` in a new session.
    ///
    /// Running out of steps without any query is a normal outcome: the result is `None`.
    pub fn run(&mut self, question: &str) -> AgentResult<(SessionState, Option<QueryResult>)> {
        let mut state = self.new_session(question);
        tracing::info!(question, max_steps = self.config.max_steps, "starting session");
        self.run_with_state(&mut state)?;
        let final_result = state.final_result().cloned();
        Ok((state, final_result))
    }
}
