//! Prompt text for a model-backed decision-maker.

use super::action::ActionKind;

const INSTRUCTIONS: &str = "\
Your task is to write a Brick SPARQL query to answer the given question. Follow a step-by-step process:

1. Start by constructing very simple fragments of the SPARQL query.
2. Execute each fragment to verify its correctness. Adjust as needed based on observations.
3. Confirm all your assumptions about the Brick schema structure before proceeding.
4. Gradually build the complete SPARQL query by adding one piece at a time.
5. Do NOT repeat the same action, as the results will be the same.
6. Continue until you find the answer.

Form exactly one \"Thought\" and perform exactly one \"Action\", then wait for the \"Observation\".";

/// Assemble the decision-maker prompt from the question and rendered history.
///
/// Both are inserted verbatim.
pub fn render_prompt(question: &str, history: &str) -> String {
    let actions: String = ActionKind::ALL
        .iter()
        .map(|k| format!("- {}\n", k.usage()))
        .collect();
    format!(
        "{INSTRUCTIONS}\n\nPossible actions:\n{actions}\nUser Question: {question}\n\n{history}\n\nOutput one \"Thought\" and one \"Action\":\n"
    )
}
