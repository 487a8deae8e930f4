// src/llm/prompts.rs
use super::ChatMessage;
use crate::models::{Job, User};
use crate::utils::truncate_chars;

pub const RANKING_SYSTEM_PROMPT: &str = "You are a career advisor who rates how well a job \
listing fits a candidate. Answer with a single JSON object and nothing else: \
{\"score\": <integer 0-100>, \"ranking\": \"strong\" | \"good\" | \"fair\" | \"poor\", \
\"reasoning\": \"<two or three sentences>\"}.";

pub const COVER_LETTER_SYSTEM_PROMPT: &str = "You write concise, specific cover letters. \
Use the candidate's real experience, address the listing's requirements directly, \
avoid clichés and placeholders, and keep it under 400 words. Return only the letter text.";

fn push_line(out: &mut String, label: &str, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        out.push_str(label);
        out.push_str(": ");
        out.push_str(value);
        out.push('\n');
    }
}

/// Candidate section shared by both prompts
pub fn candidate_profile(user: &User) -> String {
    let mut out = String::from("## Candidate\n");
    push_line(&mut out, "Name", user.name.as_deref());
    push_line(&mut out, "Desired roles", user.desired_roles.as_deref());
    push_line(&mut out, "Desired locations", user.desired_locations.as_deref());
    if let Some(min) = user.min_salary {
        out.push_str(&format!("Minimum salary: {}\n", min));
    }
    push_line(&mut out, "Additional context", user.additional_context.as_deref());
    out.push_str("\n### Resume\n");
    out.push_str(user.resume_text.as_deref().unwrap_or("").trim());
    out.push('\n');
    out
}

pub fn job_listing(job: &Job, max_description_chars: usize) -> String {
    let mut out = String::from("## Job listing\n");
    push_line(&mut out, "Title", Some(&job.title));
    push_line(&mut out, "Company", Some(&job.company));
    push_line(&mut out, "Location", job.location.as_deref());
    push_line(&mut out, "Salary", job.salary.as_deref());
    push_line(&mut out, "URL", Some(&job.url));
    out.push_str("\n### Description\n");
    out.push_str(&truncate_chars(job.best_description().trim(), max_description_chars));
    out.push('\n');
    out
}

pub fn ranking_messages(user: &User, job: &Job, max_description_chars: usize) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(RANKING_SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "{}\n{}\nRate the fit.",
            candidate_profile(user),
            job_listing(job, max_description_chars)
        )),
    ]
}

pub fn cover_letter_messages(
    system_prompt: Option<&str>,
    user: &User,
    job: &Job,
    extra_instructions: Option<&str>,
    max_description_chars: usize,
) -> Vec<ChatMessage> {
    let system = system_prompt
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(COVER_LETTER_SYSTEM_PROMPT);

    let mut request = format!(
        "{}\n{}\nWrite a cover letter for this position.",
        candidate_profile(user),
        job_listing(job, max_description_chars)
    );
    if let Some(extra) = extra_instructions.map(str::trim).filter(|s| !s.is_empty()) {
        request.push_str("\n\nAdditional instructions: ");
        request.push_str(extra);
    }

    vec![ChatMessage::system(system), ChatMessage::user(request)]
}
