//! Quiz fixtures shared across crates.

use std::collections::BTreeMap;

use quizflow_core::quiz::{
    CategoryDefinition, CombinationGuidance, QuizDefinition, QuizKind, QuizOption, Question,
    RuleTable, ScoringRule, WordMatrix,
};

fn option(label: &str, value: &str, next: Option<&str>) -> QuizOption {
    QuizOption {
        label: label.to_owned(),
        value: value.to_owned(),
        next_question_id: next.map(str::to_owned),
    }
}

fn question(id: &str, options: Vec<QuizOption>) -> Question {
    Question {
        id: id.to_owned(),
        text: format!("Base text for {id}"),
        scenario: None,
        options,
        allow_free_text: false,
    }
}

fn points(entries: &[(&str, i64)]) -> BTreeMap<String, i64> {
    entries.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect()
}

/// Four questions `q1..q4`. Each offers `a` and `b`; `q2` also offers `c`,
/// which branches straight to `q4`. Scored by a two-category rule table.
#[must_use]
pub fn linear_quiz() -> QuizDefinition {
    QuizDefinition {
        id: "trail".to_owned(),
        title: "Trail Finder".to_owned(),
        description: "Which trail suits you?".to_owned(),
        personalization: None,
        story_setup: None,
        branch_classification: false,
        explain_prompt: None,
        questions: vec![
            question("q1", vec![option("A", "a", None), option("B", "b", None)]),
            question(
                "q2",
                vec![
                    option("A", "a", None),
                    option("B", "b", None),
                    option("C", "c", Some("q4")),
                ],
            ),
            question("q3", vec![option("A", "a", None), option("B", "b", None)]),
            question("q4", vec![option("A", "a", None), option("B", "b", None)]),
        ],
        scoring: QuizKind::RuleTable(RuleTable {
            categories: vec![
                CategoryDefinition {
                    id: "ridge".to_owned(),
                    name: "Ridge Walker".to_owned(),
                    description: "You chase the view.".to_owned(),
                },
                CategoryDefinition {
                    id: "valley".to_owned(),
                    name: "Valley Rambler".to_owned(),
                    description: "You follow the river.".to_owned(),
                },
            ],
            rules: (0..4)
                .flat_map(|index| {
                    [
                        ScoringRule {
                            question_index: index,
                            value: "a".to_owned(),
                            points: points(&[("ridge", 1)]),
                        },
                        ScoringRule {
                            question_index: index,
                            value: "b".to_owned(),
                            points: points(&[("valley", 1)]),
                        },
                    ]
                })
                .collect(),
        }),
        definition_hash: "trail-hash".to_owned(),
    }
}

/// Two questions scored over categories `A` and `B`; answering `x` on
/// either awards `A:+2, B:+1`, answering `y` awards `B:+2`.
#[must_use]
pub fn rule_table_quiz() -> QuizDefinition {
    let rules = (0..2)
        .flat_map(|index| {
            [
                ScoringRule {
                    question_index: index,
                    value: "x".to_owned(),
                    points: points(&[("A", 2), ("B", 1)]),
                },
                ScoringRule {
                    question_index: index,
                    value: "y".to_owned(),
                    points: points(&[("B", 2)]),
                },
            ]
        })
        .collect();

    QuizDefinition {
        id: "letters".to_owned(),
        title: "Letters".to_owned(),
        description: String::new(),
        personalization: None,
        story_setup: None,
        branch_classification: false,
        explain_prompt: None,
        questions: vec![
            question("first", vec![option("X", "x", None), option("Y", "y", None)]),
            question("second", vec![option("X", "x", None), option("Y", "y", None)]),
        ],
        scoring: QuizKind::RuleTable(RuleTable {
            categories: vec![
                CategoryDefinition {
                    id: "A".to_owned(),
                    name: "Alpha".to_owned(),
                    description: "Static alpha description.".to_owned(),
                },
                CategoryDefinition {
                    id: "B".to_owned(),
                    name: "Beta".to_owned(),
                    description: "Static beta description.".to_owned(),
                },
            ],
            rules,
        }),
        definition_hash: "letters-hash".to_owned(),
    }
}

/// Two questions scored by mediated selection over a small word matrix.
#[must_use]
pub fn mediated_quiz(gated: bool) -> QuizDefinition {
    QuizDefinition {
        id: "spirit".to_owned(),
        title: "Spirit Pair".to_owned(),
        description: String::new(),
        personalization: None,
        story_setup: Some("A lantern-lit market at dusk.".to_owned()),
        branch_classification: false,
        explain_prompt: None,
        questions: vec![
            Question {
                id: "m1".to_owned(),
                text: "How do you greet a stranger?".to_owned(),
                scenario: Some("A stranger waves from across the square.".to_owned()),
                options: vec![option("Wave back", "wave", None), option("Nod", "nod", None)],
                allow_free_text: true,
            },
            Question {
                id: "m2".to_owned(),
                text: "Which stall do you visit?".to_owned(),
                scenario: None,
                options: vec![option("Maps", "maps", None), option("Tea", "tea", None)],
                allow_free_text: false,
            },
        ],
        scoring: QuizKind::Mediated(WordMatrix {
            first_words: vec!["Bold".to_owned(), "Gentle".to_owned()],
            second_words: vec!["Explorer".to_owned(), "Keeper".to_owned()],
            guidance: vec![CombinationGuidance {
                first_word: "Bold".to_owned(),
                second_word: "Explorer".to_owned(),
                guidance: "Seeks the unknown.".to_owned(),
            }],
            gated,
        }),
        definition_hash: "spirit-hash".to_owned(),
    }
}
