use practice_core::model::{
    ChoiceOption, Citation, Difficulty, MatchPair, Question, QuestionBody, QuestionSet,
};

/// Demo set covering every question kind.
#[must_use]
pub fn demo_set(set_id: &str) -> QuestionSet {
    QuestionSet::new(
        set_id,
        "Rust ownership basics",
        "rust-101",
        Difficulty::Basic,
        vec![
            Question::new(
                "move-semantics",
                "What happens to `a` after `let b = a;` when `a` is a `String`?",
                Difficulty::Basic,
                QuestionBody::MultipleChoice {
                    options: vec![
                        ChoiceOption::new("copied", "It is copied", false),
                        ChoiceOption::new("moved", "It is moved and can no longer be used", true),
                        ChoiceOption::new("borrowed", "It is borrowed", false),
                    ],
                },
            )
            .with_explanation("`String` is not `Copy`, so assignment moves ownership.")
            .with_citation(Citation {
                title: "The Rust Programming Language".into(),
                preview: "Ways Variables and Data Interact: Move".into(),
                page_number: Some(4),
            }),
            Question::new(
                "borrow-rule",
                "You may hold a mutable and an immutable reference to the same value at once.",
                Difficulty::Basic,
                QuestionBody::true_false(false),
            ),
            Question::new(
                "drop-trait",
                "Values are released by the ___ trait when their owner goes out of ___.",
                Difficulty::Medium,
                QuestionBody::FillInBlank {
                    blanks: vec!["Drop".into(), "scope".into()],
                },
            ),
            Question::new(
                "smart-pointers",
                "Match each type to what it provides.",
                Difficulty::Medium,
                QuestionBody::Matching {
                    pairs: vec![
                        MatchPair::new("Box", "heap allocation"),
                        MatchPair::new("Rc", "shared ownership"),
                        MatchPair::new("RefCell", "interior mutability"),
                    ],
                },
            ),
            Question::new(
                "why-borrowck",
                "Explain what the borrow checker prevents.",
                Difficulty::Advanced,
                QuestionBody::ShortAnswer {
                    sample_answer: "Data races and use-after-free at compile time.".into(),
                },
            ),
        ],
    )
    .with_description("Moves, borrows and smart pointers.")
}
