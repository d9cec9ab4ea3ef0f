//! Per-question analytics
//!
//! - choice types: hitungan per opsi, urut sesuai konfigurasi opsi
//! - rating / linear_scale: rata-rata + distribusi nilai
//! - lainnya: jumlah jawaban

use serde::Serialize;
use std::collections::HashMap;

use crate::models::{Answer, FormDetail, Question, QuestionType};

/// One bar of a chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub name: String,
    pub value: u64,
    /// Share of all counted values, 0-100
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatsKind {
    Options { data: Vec<Bucket> },
    Numeric { average: f64, distribution: Vec<Bucket> },
    Text { count: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionStats {
    #[serde(flatten)]
    pub question: Question,
    pub stats: StatsKind,
}

/// Analytics payload for one form
#[derive(Debug, Clone, Serialize)]
pub struct FormStatistics {
    pub form: FormDetail,
    pub total_responses: i64,
    pub question_stats: Vec<QuestionStats>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn buckets(counts: Vec<(String, u64)>) -> Vec<Bucket> {
    let total: u64 = counts.iter().map(|(_, n)| n).sum();
    counts
        .into_iter()
        .map(|(name, value)| Bucket {
            name,
            value,
            percentage: if total == 0 {
                0.0
            } else {
                round2(value as f64 * 100.0 / total as f64)
            },
        })
        .collect()
}

/// Build statistics for every question, in question order
pub fn summarize(questions: &[Question], answers: &[Answer]) -> Vec<QuestionStats> {
    let mut by_question: HashMap<&str, Vec<&Answer>> = HashMap::new();
    for answer in answers {
        by_question.entry(answer.question_id.as_str()).or_default().push(answer);
    }

    questions
        .iter()
        .map(|question| {
            let given = by_question.get(question.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            QuestionStats {
                question: question.clone(),
                stats: stats_for(question, given),
            }
        })
        .collect()
}

fn stats_for(question: &Question, answers: &[&Answer]) -> StatsKind {
    if question.question_type.has_options() {
        return StatsKind::Options {
            data: option_counts(question, answers),
        };
    }

    if let Some((min, max)) = question.numeric_range() {
        return numeric_stats(min, max, answers);
    }

    StatsKind::Text {
        count: answers.len(),
    }
}

fn option_counts(question: &Question, answers: &[&Answer]) -> Vec<Bucket> {
    let options = question.option_list();
    let mut counts: Vec<(String, u64)> = options.iter().map(|o| (o.clone(), 0)).collect();

    let mut tally = |picked: &str| {
        if let Some(slot) = counts.iter_mut().find(|slot| slot.0 == picked) {
            slot.1 += 1;
        }
    };

    for value in answers.iter().filter_map(|a| a.value.as_deref()) {
        if question.question_type == QuestionType::Checkboxes {
            // malformed JSON is ignored
            if let Ok(items) = serde_json::from_str::<Vec<String>>(value) {
                items.iter().for_each(|item| tally(item.as_str()));
            }
        } else {
            tally(value);
        }
    }

    buckets(counts)
}

fn numeric_stats(min: i64, max: i64, answers: &[&Answer]) -> StatsKind {
    let values: Vec<i64> = answers
        .iter()
        .filter_map(|a| a.value.as_deref())
        .filter_map(|v| v.trim().parse().ok())
        .collect();

    let average = if values.is_empty() {
        0.0
    } else {
        round2(values.iter().sum::<i64>() as f64 / values.len() as f64)
    };

    let counts = (min..=max)
        .map(|n| {
            let hits = values.iter().filter(|&&v| v == n).count() as u64;
            (n.to_string(), hits)
        })
        .collect();

    StatsKind::Numeric {
        average,
        distribution: buckets(counts),
    }
}
