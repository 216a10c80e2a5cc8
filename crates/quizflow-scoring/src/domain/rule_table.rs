//! Rule-table accumulation.

use quizflow_core::quiz::{CategoryDefinition, RuleTable};
use quizflow_core::response::{CategoryScore, Response};

/// Sums every response's point deltas into per-category accumulators,
/// returned in category declaration order. Accumulators start at zero on
/// every call, so the tally depends only on `responses`.
#[must_use]
pub fn tally(table: &RuleTable, responses: &[Response]) -> Vec<CategoryScore> {
    let mut scores: Vec<CategoryScore> = table
        .categories
        .iter()
        .map(|c| CategoryScore {
            category_id: c.id.clone(),
            score: 0,
        })
        .collect();

    for response in responses {
        let Some(points) = table.points_for(response.question_index, &response.value) else {
            continue;
        };
        for (category_id, delta) in points {
            if let Some(entry) = scores.iter_mut().find(|s| s.category_id == *category_id) {
                entry.score += delta;
            }
        }
    }

    scores
}

/// The category with the strictly highest score; ties go to the category
/// declared first. `None` only when the table has no categories.
#[must_use]
pub fn winner<'a>(table: &'a RuleTable, scores: &[CategoryScore]) -> Option<&'a CategoryDefinition> {
    let mut best: Option<(usize, i64)> = None;
    for (index, score) in scores.iter().enumerate() {
        match best {
            Some((_, top)) if score.score <= top => {}
            _ => best = Some((index, score.score)),
        }
    }
    best.and_then(|(index, _)| table.categories.get(index))
}
