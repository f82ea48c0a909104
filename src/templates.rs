//! Prompt templates: OR/AND prompter pairs and appraisal oracle prompts
//!
//! Templates are opaque to the search. `$g` is replaced by the goal under
//! expansion and `$context` by the rendered ancestor trace.

use serde::{Deserialize, Serialize};

/// OR/AND prompt pair steering one exploration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompter {
    pub name: String,
    /// Asks for the conjunctive sub-goals of `$g`
    pub and_p: String,
    /// Asks for alternative ways to achieve `$g`
    pub or_p: String,
}

/// Single prompt for an appraisal oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OraclePrompt {
    pub name: String,
    pub pattern: String,
}

fn prompter(name: &str, and_p: &str, or_p: &str) -> Prompter {
    Prompter {
        name: name.to_string(),
        and_p: and_p.to_string(),
        or_p: or_p.to_string(),
    }
}

/// All built-in prompters
pub fn get_prompters() -> Vec<Prompter> {
    vec![
        task_planning(),
        thesis_support(),
        cons_and_pros(),
        causal(),
        consequences(),
        scientific(),
        recommender(),
        strict_recommender(),
    ]
}

/// Look a prompter up by name
pub fn find(name: &str) -> Option<Prompter> {
    get_prompters().into_iter().find(|p| p.name == name)
}

fn task_planning() -> Prompter {
    prompter(
        "step_by_step_guidance_to_achieve_a_goal",
        r#"The plan so far is: "$context".
In this context my goal is "$g".
Tell me, step by step, how to achieve "$g", keeping the steps consistent with each other.
Itemize your answer, one sentence per line."#,
        r#"The plan so far is: "$context".
In this context my goal is "$g".
Suggest 2-3 mutually exclusive alternative ways to achieve "$g".
Do not start a sentence with the word "Alternative"."#,
    )
}

fn thesis_support() -> Prompter {
    prompter(
        "supporting_arguments_for_a_thesis",
        r#"The context discussed so far is: "$context".
The thesis I want to argue for is "$g".
List a few reasons for "$g" that are consistent with each other.
Itemize your answer, one sentence per line."#,
        r#"The context discussed so far is: "$context".
The thesis I want to argue for is "$g".
Suggest a few alternative, mutually exclusive reasons that support "$g".
Itemize your answer, one sentence per line."#,
    )
}

fn cons_and_pros() -> Prompter {
    prompter(
        "cons_and_pros_for_a_thesis",
        r#"The context discussed so far is: "$context".
The thesis I want to argue against is "$g".
List a few mutually consistent reasons that together argue against "$g".
Itemize your answer, one sentence per line."#,
        r#"The context discussed so far is: "$context".
The thesis I want to argue against is "$g".
Suggest a few alternative, mutually exclusive sentences, each a strong argument against "$g".
Itemize your answer, one sentence per line."#,
    )
}

fn causal() -> Prompter {
    prompter(
        "causal_inference",
        r#"We need causal explanations in this context: "$context".
Give 3-5 explanations of 2-4 words each for the causes of "$g".
Itemize your answer, one cause of "$g" per line.
Only the noun phrase, no explanations, no ":" and no word "Cause"."#,
        r#"We need causal explanations in this context: "$context".
Give 2-3 alternative explanations citing facts that might cause "$g".
Itemize your answer, one noun phrase per line.
Only the noun phrase, no explanations, no ":" and no words "Alternative" or "Causes"."#,
    )
}

fn consequences() -> Prompter {
    prompter(
        "consequence_prediction",
        r#"We need to predict consequences in this context: "$context".
Give 3-5 noun phrases of 2-4 words each describing consequences of "$g".
Itemize your answer, one consequence of "$g" per line.
Only the noun phrase, no explanations and no ":"."#,
        r#"We need to predict consequences of "$g" in this context: "$context".
Give 2-3 alternative predictions citing facts likely to follow from "$g".
Itemize your answer, one noun phrase per line.
Only the noun phrase, no explanations, no ":" and no word "Alternative"."#,
    )
}

fn scientific() -> Prompter {
    prompter(
        "scientific_concept_explorer",
        r#"The task we are exploring is: "$context".
Give 3-5 noun phrases of 2-4 words each that appear as keyphrases in scientific papers about "$g".
Itemize your answer, one noun phrase per line.
Only the noun phrase, no explanations."#,
        r#"The topic we are exploring is: "$context".
Give 2-3 noun phrases describing details of "$g".
Itemize your answer, one noun phrase per line.
Only the noun phrase, no explanations."#,
    )
}

fn recommender() -> Prompter {
    prompter(
        "recommender_system",
        r#"The recommendations so far are: "$context".
In this context I really liked "$g".
Suggest 2-3 related ones that go well together.
Give each title on its own line, no comments or summaries."#,
        r#"The recommendations so far are: "$context".
In this context I am considering "$g".
Suggest 2-3 distinct alternative recommendations instead of "$g".
Give each title on its own line, no comments, no commas, and do not start with "Sure"."#,
    )
}

fn strict_recommender() -> Prompter {
    prompter(
        "strict_recommender",
        r#"The recommendations so far are: "$context".
In this context I really liked "$g".
Suggest 2-3 related ones.
Give each title on its own line, with no text before or after the titles."#,
        r#"The recommendations so far are: "$context".
In this context I am considering "$g".
Suggest 2-3 distinct alternative recommendations instead of "$g".
Give each title on its own line, with no text before or after the titles and do not start with "Sure"."#,
    )
}

/// True/False relevance judgment of `$g` against `$context`
pub fn decider_oracle() -> OraclePrompt {
    OraclePrompt {
        name: "decider_oracle".to_string(),
        pattern: r#"You decide whether "$g" is relevant to "$context": someone familiar with "$context" would also be interested in "$g".
Answer with exactly one word, "True" or "False". No explanations or comments."#
            .to_string(),
    }
}

/// Stricter True/False judgment: `$g` must be semantically close to and
/// strongly relevant for `$context`
pub fn relevance_oracle() -> OraclePrompt {
    OraclePrompt {
        name: "relevance_oracle".to_string(),
        pattern: r#"You decide whether "$g" is semantically close to and strongly relevant for "$context".
Answer "True" only if you strongly agree that it is, "False" on any doubt.
Answer with exactly one word, "True" or "False". No explanations or comments."#
            .to_string(),
    }
}

/// 0-100 relevance rating of `$g` against `$context`
pub fn rater_oracle() -> OraclePrompt {
    OraclePrompt {
        name: "rater_oracle".to_string(),
        pattern: r#"On a scale from 0 to 100, rate how relevant and semantically close "$g" is to "$context".
Answer in the form: rating | explanation.
The rating is a number between 0 and 100, nothing else.
The explanation is at most two short sentences, relevant to "$context", without citing sources."#
            .to_string(),
    }
}
