//! Decision-makers: whatever picks the next action.
//!
//! The loop driver only sees the [`DecisionMaker`] trait. Three implementations:
//!
//! - [`LlmController`]: prompts a [`Predictor`] (normally Ollama) and parses the reply
//! - [`ScriptedController`]: replays a fixed sequence, for tests and offline runs
//! - [`FallbackController`]: tries one decision-maker and falls back to another
//!   when the first one's output cannot be parsed

use super::action::Action;
use super::error::{AgentError, AgentResult};
use super::llm::Predictor;
use super::parse::parse_action;
use super::prompt::render_prompt;

/// What a decision-maker sees at each step.
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    pub question: &'a str,
    /// Rendered recent actions (see `SessionState::history_for_context`).
    pub history: &'a str,
    /// Zero-based index of the step being decided.
    pub step: usize,
}

/// Picks the next action given the question and history.
pub trait DecisionMaker {
    fn next_action(&mut self, context: &DecisionContext<'_>) -> AgentResult<Action>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

impl<D: DecisionMaker + ?Sized> DecisionMaker for Box<D> {
    fn next_action(&mut self, context: &DecisionContext<'_>) -> AgentResult<Action> {
        (**self).next_action(context)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Prompts a language model and parses its reply into an action.
#[derive(Debug)]
pub struct LlmController<P> {
    predictor: P,
}

impl<P: Predictor> LlmController<P> {
    pub fn new(predictor: P) -> Self {
        Self { predictor }
    }

    pub fn predictor(&self) -> &P {
        &self.predictor
    }
}

impl<P: Predictor> DecisionMaker for LlmController<P> {
    fn next_action(&mut self, context: &DecisionContext<'_>) -> AgentResult<Action> {
        let prompt = render_prompt(context.question, context.history);
        tracing::debug!(step = context.step, prompt_len = prompt.len(), "prompting model");
        let reply = self.predictor.predict(&prompt)?;
        tracing::debug!(step = context.step, reply = %reply, "model reply");
        parse_action(&reply)
    }

    fn name(&self) -> &str {
        "llm"
    }
}

/// How a [`ScriptedController`] picks its next script entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Replay {
    /// Next unused entry, then `stop()`.
    InOrder,
    /// Next unused entry, then the last one forever.
    RepeatLast,
    /// Entry at the step being decided, whatever came before; `stop()` past the end.
    ByStep,
}

/// Replays a fixed list of actions, then stops.
#[derive(Debug, Clone)]
pub struct ScriptedController {
    script: Vec<Action>,
    cursor: usize,
    replay: Replay,
}

impl ScriptedController {
    /// Replay `script` in order; once it runs out, return `stop()`.
    pub fn new(script: Vec<Action>) -> Self {
        Self {
            script,
            cursor: 0,
            replay: Replay::InOrder,
        }
    }

    /// Replay `script`, then keep returning its last action forever.
    pub fn repeating(script: Vec<Action>) -> Self {
        Self {
            replay: Replay::RepeatLast,
            ..Self::new(script)
        }
    }

    /// Return `script[step]` for whichever step is being decided.
    ///
    /// Suits a fallback that only answers some steps: it stays in line with
    /// the session instead of restarting from its first entry.
    pub fn by_step(script: Vec<Action>) -> Self {
        Self {
            replay: Replay::ByStep,
            ..Self::new(script)
        }
    }

    /// The canned room-temperature walkthrough: search, inspect, query, stop.
    /// Entries are picked by step, so it can take over a session midway.
    pub fn room_temperature_demo() -> Self {
        use super::action::ActionKind;

        Self::by_step(vec![
            Action::new(
                "I need to find sensors related to the question",
                ActionKind::Search,
                "temperature",
            ),
            Action::new(
                "Let me explore the RM_TEMP sensor to understand its properties",
                ActionKind::Inspect,
                "RM_TEMP",
            ),
            Action::new(
                "I'll test a simple query to get temperature values",
                ActionKind::ExecuteQuery,
                "SELECT ?value WHERE { bldg:RM_TEMP ref:hasObservation ?obs . ?obs ref:hasValue ?value } LIMIT 10",
            ),
            Action::stop("Query works! Ready to finalize"),
        ])
    }

    pub fn remaining(&self) -> usize {
        self.script.len().saturating_sub(self.cursor)
    }
}

impl DecisionMaker for ScriptedController {
    fn next_action(&mut self, context: &DecisionContext<'_>) -> AgentResult<Action> {
        let index = match self.replay {
            Replay::ByStep => context.step,
            Replay::InOrder | Replay::RepeatLast => self.cursor,
        };
        if let Some(action) = self.script.get(index) {
            self.cursor = index + 1;
            return Ok(action.clone());
        }
        match self.script.last() {
            Some(last) if self.replay == Replay::RepeatLast => Ok(last.clone()),
            _ => Ok(Action::stop("script exhausted")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Uses `primary`, switching to `fallback` for any step whose output the
/// primary could not turn into an action.
///
/// Transport errors from the primary are not masked.
#[derive(Debug)]
pub struct FallbackController<P, F> {
    primary: P,
    fallback: F,
    fallbacks_used: usize,
}

impl<P: DecisionMaker, F: DecisionMaker> FallbackController<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self {
            primary,
            fallback,
            fallbacks_used: 0,
        }
    }

    /// Steps decided by the fallback so far.
    pub fn fallbacks_used(&self) -> usize {
        self.fallbacks_used
    }
}

impl<P: DecisionMaker, F: DecisionMaker> DecisionMaker for FallbackController<P, F> {
    fn next_action(&mut self, context: &DecisionContext<'_>) -> AgentResult<Action> {
        match self.primary.next_action(context) {
            Err(e @ (AgentError::ActionParse { .. } | AgentError::InvalidActionKind { .. })) => {
                tracing::warn!(
                    step = context.step,
                    primary = self.primary.name(),
                    fallback = self.fallback.name(),
                    "unusable decision, falling back: {e}"
                );
                self.fallbacks_used += 1;
                self.fallback.next_action(context)
            }
            other => other,
        }
    }

    fn name(&self) -> &str {
        "fallback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::action::ActionKind;
    use crate::agent::llm::LlmError;

    const CONTEXT: DecisionContext<'static> = DecisionContext {
        question: "What are the room temperature values?",
        history: "",
        step: 0,
    };

    #[test]
    fn scripted_replays_then_stops() {
        let mut c = ScriptedController::new(vec![Action::new("", ActionKind::Search, "a")]);
        assert_eq!(c.next_action(&CONTEXT).unwrap().argument(), "a");
        assert_eq!(c.remaining(), 0);
        assert_eq!(c.next_action(&CONTEXT).unwrap().kind(), ActionKind::Stop);
    }

    #[test]
    fn repeating_script_never_stops() {
        let mut c = ScriptedController::repeating(vec![Action::new("", ActionKind::Search, "a")]);
        for _ in 0..5 {
            assert_eq!(c.next_action(&CONTEXT).unwrap().kind(), ActionKind::Search);
        }
    }

    fn at_step(step: usize) -> DecisionContext<'static> {
        DecisionContext { step, ..CONTEXT }
    }

    #[test]
    fn demo_script_shape() {
        let mut c = ScriptedController::room_temperature_demo();
        let kinds: Vec<_> = (0..4).map(|i| c.next_action(&at_step(i)).unwrap().kind()).collect();
        assert_eq!(
            kinds,
            [
                ActionKind::Search,
                ActionKind::Inspect,
                ActionKind::ExecuteQuery,
                ActionKind::Stop
            ]
        );
    }

    #[test]
    fn by_step_follows_the_session_not_its_own_calls() {
        let mut c = ScriptedController::by_step(vec![
            Action::new("", ActionKind::Search, "a"),
            Action::new("", ActionKind::Inspect, "b"),
            Action::new("", ActionKind::Search, "c"),
        ]);
        assert_eq!(c.next_action(&at_step(1)).unwrap().argument(), "b");
        assert_eq!(c.next_action(&at_step(2)).unwrap().argument(), "c");
        assert_eq!(c.remaining(), 0);
        assert_eq!(c.next_action(&at_step(7)).unwrap().kind(), ActionKind::Stop);
    }

    #[test]
    fn fallback_takes_over_midway() {
        let calls = std::cell::Cell::new(0);
        let flaky = LlmController::new(move |_: &str| -> Result<String, LlmError> {
            calls.set(calls.get() + 1);
            Ok(if calls.get() == 1 {
                "Thought: find sensors\nAction: search_brick(temperature)".to_string()
            } else {
                "no idea".to_string()
            })
        });
        let mut c = FallbackController::new(flaky, ScriptedController::room_temperature_demo());
        let kinds: Vec<_> = (0..4).map(|i| c.next_action(&at_step(i)).unwrap().kind()).collect();
        assert_eq!(
            kinds,
            [
                ActionKind::Search,
                ActionKind::Inspect,
                ActionKind::ExecuteQuery,
                ActionKind::Stop
            ]
        );
        assert_eq!(c.fallbacks_used(), 3);
    }

    #[test]
    fn llm_controller_parses_reply_and_sees_question() {
        let predictor = |prompt: &str| -> Result<String, LlmError> {
            assert!(prompt.contains("User Question: What are the room temperature values?"));
            Ok("Thought: find sensors\nAction: search_brick(temperature)".to_string())
        };
        let mut c = LlmController::new(predictor);
        let action = c.next_action(&CONTEXT).unwrap();
        assert_eq!(action.kind(), ActionKind::Search);
        assert_eq!(action.rationale(), "find sensors");
    }

    #[test]
    fn llm_parse_failure_is_distinct() {
        let mut c = LlmController::new(|_: &str| -> Result<String, LlmError> {
            Ok("I am not sure what to do".to_string())
        });
        assert!(matches!(
            c.next_action(&CONTEXT),
            Err(AgentError::ActionParse { .. })
        ));
    }

    #[test]
    fn fallback_covers_parse_failures_only() {
        let garbled = LlmController::new(|_: &str| -> Result<String, LlmError> {
            Ok("Action: execute_sparql(SELECT (".to_string())
        });
        let mut c = FallbackController::new(garbled, ScriptedController::room_temperature_demo());
        assert_eq!(c.next_action(&CONTEXT).unwrap().kind(), ActionKind::Search);
        assert_eq!(c.fallbacks_used(), 1);

        let offline = LlmController::new(|_: &str| -> Result<String, LlmError> {
            Err(LlmError::RequestFailed {
                message: "connection refused".into(),
            })
        });
        let mut c = FallbackController::new(offline, ScriptedController::room_temperature_demo());
        assert!(matches!(c.next_action(&CONTEXT), Err(AgentError::Llm(_))));
        assert_eq!(c.fallbacks_used(), 0);
    }
}
