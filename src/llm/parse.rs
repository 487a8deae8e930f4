// src/llm/parse.rs
//! Pull a ranking verdict out of free-form model output

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::RankingLabel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingVerdict {
    pub label: RankingLabel,
    pub score: i64,
    pub reasoning: String,
}

/// Models wrap JSON in fences or prose; take the first balanced object
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

fn score_from(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f.round() as i64),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    }
}

pub fn parse_ranking_verdict(reply: &str) -> Result<RankingVerdict> {
    let json = extract_json_object(reply)
        .ok_or_else(|| anyhow::anyhow!("Model reply contains no JSON object"))?;
    let value: Value = serde_json::from_str(json).context("Model reply JSON is malformed")?;

    let score = value
        .get("score")
        .and_then(score_from)
        .ok_or_else(|| anyhow::anyhow!("Model reply has no numeric score"))?
        .clamp(0, 100);

    let label = value
        .get("ranking")
        .or_else(|| value.get("label"))
        .and_then(Value::as_str)
        .and_then(RankingLabel::parse)
        .unwrap_or_else(|| RankingLabel::from_score(score));

    let reasoning = value
        .get("reasoning")
        .or_else(|| value.get("reason"))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    Ok(RankingVerdict {
        label,
        score,
        reasoning,
    })
}
