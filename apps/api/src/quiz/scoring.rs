use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::quiz::{QuizQuestionRow, QuizStyleRow};

#[derive(Debug, Clone, Deserialize)]
pub struct QuizAnswer {
    pub question_id: Uuid,
    pub liked: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StyleScore {
    pub slug: String,
    pub name: String,
    pub likes: u32,
    /// Fraction of all likes that went to this style, 0.0 – 1.0.
    pub share: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuizResult {
    pub recommended: Option<StyleScore>,
    pub ranking: Vec<StyleScore>,
    pub answered: usize,
    /// Answers naming questions that are unknown or inactive.
    pub ignored: usize,
}

/// Tallies liked answers per style.
///
/// Ranking: likes desc, then the styles' configured order, then slug. A repeated
/// answer for the same question keeps the last one. With no likes at all there
/// is no recommendation.
pub fn tally(
    styles: &[QuizStyleRow],
    questions: &[QuizQuestionRow],
    answers: &[QuizAnswer],
) -> QuizResult {
    let question_styles: HashMap<Uuid, &str> = questions
        .iter()
        .filter(|q| q.is_active)
        .map(|q| (q.id, q.style_slug.as_str()))
        .collect();

    let mut latest: HashMap<Uuid, bool> = HashMap::new();
    let mut ignored = 0;
    for answer in answers {
        if question_styles.contains_key(&answer.question_id) {
            latest.insert(answer.question_id, answer.liked);
        } else {
            ignored += 1;
        }
    }

    let mut likes: HashMap<&str, u32> = HashMap::new();
    for (question_id, liked) in &latest {
        if *liked {
            if let Some(slug) = question_styles.get(question_id) {
                *likes.entry(*slug).or_insert(0) += 1;
            }
        }
    }
    let total_likes: u32 = likes.values().sum();

    let mut ordered: Vec<&QuizStyleRow> = styles.iter().collect();
    ordered.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.slug.cmp(&b.slug)));

    let mut ranking: Vec<StyleScore> = ordered
        .into_iter()
        .map(|style| {
            let count = likes.get(style.slug.as_str()).copied().unwrap_or(0);
            StyleScore {
                slug: style.slug.clone(),
                name: style.name.clone(),
                likes: count,
                share: if total_likes > 0 {
                    f64::from(count) / f64::from(total_likes)
                } else {
                    0.0
                },
            }
        })
        .collect();
    // Stable sort keeps the configured order among equal counts.
    ranking.sort_by(|a, b| b.likes.cmp(&a.likes));

    let recommended = ranking.first().filter(|s| s.likes > 0).cloned();

    QuizResult {
        recommended,
        ranking,
        answered: latest.len(),
        ignored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn style(slug: &str, sort_order: i32) -> QuizStyleRow {
        QuizStyleRow {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            name: slug.to_uppercase(),
            description: String::new(),
            image_url: None,
            sort_order,
        }
    }

    fn question(slug: &str) -> QuizQuestionRow {
        QuizQuestionRow {
            id: Uuid::new_v4(),
            question: format!("Do you like this {slug} room?"),
            image_url: None,
            style_slug: slug.to_string(),
            sort_order: 0,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn like(q: &QuizQuestionRow, liked: bool) -> QuizAnswer {
        QuizAnswer {
            question_id: q.id,
            liked,
        }
    }

    #[test]
    fn test_most_liked_style_recommended() {
        let styles = vec![style("minimalist", 0), style("industrial", 1)];
        let questions = vec![question("minimalist"), question("industrial"), question("industrial")];
        let answers = vec![
            like(&questions[0], true),
            like(&questions[1], true),
            like(&questions[2], true),
        ];
        let result = tally(&styles, &questions, &answers);
        let top = result.recommended.unwrap();
        assert_eq!(top.slug, "industrial");
        assert_eq!(top.likes, 2);
        assert!((top.share - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_ties_follow_style_order() {
        let styles = vec![style("classic", 1), style("japandi", 0)];
        let questions = vec![question("classic"), question("japandi")];
        let answers = vec![like(&questions[0], true), like(&questions[1], true)];
        let result = tally(&styles, &questions, &answers);
        assert_eq!(result.recommended.unwrap().slug, "japandi");
    }

    #[test]
    fn test_no_likes_no_recommendation() {
        let styles = vec![style("minimalist", 0)];
        let questions = vec![question("minimalist")];
        let result = tally(&styles, &questions, &[like(&questions[0], false)]);
        assert!(result.recommended.is_none());
        assert_eq!(result.ranking[0].share, 0.0);
        assert_eq!(result.answered, 1);
    }

    #[test]
    fn test_last_answer_wins_and_unknown_ignored() {
        let styles = vec![style("minimalist", 0)];
        let questions = vec![question("minimalist")];
        let answers = vec![
            like(&questions[0], true),
            like(&questions[0], false),
            QuizAnswer {
                question_id: Uuid::new_v4(),
                liked: true,
            },
        ];
        let result = tally(&styles, &questions, &answers);
        assert!(result.recommended.is_none());
        assert_eq!(result.answered, 1);
        assert_eq!(result.ignored, 1);
    }

    #[test]
    fn test_inactive_questions_ignored() {
        let styles = vec![style("minimalist", 0)];
        let mut inactive = question("minimalist");
        inactive.is_active = false;
        let answers = vec![like(&inactive, true)];
        let result = tally(&styles, &[inactive], &answers);
        assert_eq!(result.ignored, 1);
        assert!(result.recommended.is_none());
    }
}
