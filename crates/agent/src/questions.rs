use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use talentscout_core::config::InterviewConfig;
use talentscout_core::domain::question::{Question, QuestionSet, QuestionSource};
use talentscout_core::errors::IntakeError;
use talentscout_core::taxonomy::{render_template, TechTaxonomy, TechTaxonomyEntry};

use crate::llm::{LlmClient, LlmError};
use crate::prompts;

/// How many questions a session gets and how many of them the LLM may tailor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuestionPolicy {
    pub min_per_technology: usize,
    pub max_per_technology: usize,
    pub max_total: usize,
    /// Slots per technology reserved for LLM questions before static templates are used.
    pub tailored_per_technology: usize,
}

impl Default for QuestionPolicy {
    fn default() -> Self {
        Self::from_config(&InterviewConfig::default())
    }
}

impl QuestionPolicy {
    pub fn from_config(config: &InterviewConfig) -> Self {
        Self {
            min_per_technology: config.min_per_technology,
            max_per_technology: config.max_per_technology,
            max_total: config.max_total,
            tailored_per_technology: config.tailored_per_technology,
        }
    }

    /// How many of the declared technologies get questions. Each covered one
    /// must be able to reach `min_per_technology` within `max_total`.
    pub fn covered(&self, technologies: usize) -> usize {
        let room = (self.max_total / self.min_per_technology.max(1)).max(1);
        technologies.min(room)
    }

    /// Questions per covered technology when `technologies` were declared.
    pub fn quota(&self, technologies: usize) -> usize {
        let covered = self.covered(technologies);
        if covered == 0 {
            return 0;
        }
        (self.max_total / covered).clamp(1, self.max_per_technology.max(1))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenerationReport {
    pub questions: QuestionSet,
    /// Recoverable problems that made the generator fall back to static material.
    pub fallbacks: Vec<IntakeError>,
    pub llm_requests: usize,
    /// Technologies that got no questions because the total bound was reached.
    pub truncated: Vec<String>,
}

pub struct QuestionGenerator {
    taxonomy: Arc<TechTaxonomy>,
    policy: QuestionPolicy,
    llm: Option<(Arc<dyn LlmClient>, Duration)>,
}

impl QuestionGenerator {
    pub fn new(taxonomy: Arc<TechTaxonomy>, policy: QuestionPolicy) -> Self {
        Self { taxonomy, policy, llm: None }
    }

    pub fn with_llm(mut self, client: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        self.llm = Some((client, timeout));
        self
    }

    pub fn policy(&self) -> &QuestionPolicy {
        &self.policy
    }

    pub fn llm_provider(&self) -> Option<&'static str> {
        self.llm.as_ref().map(|(client, _)| client.provider())
    }

    /// Builds the session's questions. Never fails: LLM trouble is reported in
    /// `fallbacks` and the slots are filled from the taxonomy instead.
    pub async fn generate(
        &self,
        tech_stack: &[String],
        years_experience: Option<f64>,
    ) -> GenerationReport {
        let mut report = GenerationReport::default();
        let mut entries: Vec<&TechTaxonomyEntry> =
            tech_stack.iter().filter_map(|name| self.taxonomy.get(name)).collect();
        let quota = self.policy.quota(entries.len());
        let covered = self.policy.covered(entries.len());
        if covered < entries.len() {
            tracing::debug!(
                event_name = "questions.coverage_reduced",
                technologies = entries.len(),
                covered,
                min_per_technology = self.policy.min_per_technology,
                "total question bound leaves later technologies without questions"
            );
            entries.truncate(covered);
        }

        let mut seen = HashSet::new();
        let mut questions = Vec::new();
        for entry in entries {
            let picked = self
                .questions_for(entry, quota, years_experience, &mut seen, &mut report)
                .await;
            questions.extend(picked);
        }

        if questions.len() > self.policy.max_total {
            questions.truncate(self.policy.max_total);
        }
        let kept: HashSet<&str> = questions.iter().map(|q| q.technology.as_str()).collect();
        report.truncated = tech_stack
            .iter()
            .filter(|name| self.taxonomy.get(name).is_some() && !kept.contains(name.as_str()))
            .cloned()
            .collect();
        report.questions = QuestionSet::new(questions);
        report
    }

    async fn questions_for(
        &self,
        entry: &TechTaxonomyEntry,
        quota: usize,
        years_experience: Option<f64>,
        seen: &mut HashSet<String>,
        report: &mut GenerationReport,
    ) -> Vec<Question> {
        let mut picked = Vec::with_capacity(quota);
        let mut templates = entry.question_templates.iter();

        let static_slots = match self.llm {
            Some(_) => quota.saturating_sub(self.policy.tailored_per_technology),
            None => quota,
        };
        while picked.len() < static_slots {
            let Some(template) = templates.next() else {
                break;
            };
            push_unique(&mut picked, seen, entry, template.clone(), QuestionSource::Template);
        }

        let wanted = quota.saturating_sub(picked.len());
        if wanted > 0 {
            if let Some((client, timeout)) = &self.llm {
                report.llm_requests += 1;
                let chosen: Vec<String> = picked.iter().map(|question| question.text.clone()).collect();
                let tailored = self
                    .request_tailored(client.as_ref(), *timeout, entry, years_experience, wanted, &chosen)
                    .await;
                match tailored {
                    Ok(texts) => {
                        for text in texts {
                            if picked.len() >= quota {
                                break;
                            }
                            push_unique(&mut picked, seen, entry, text, QuestionSource::Llm);
                        }
                    }
                    Err(error) => {
                        tracing::warn!(
                            event_name = "questions.llm_fallback",
                            technology = %entry.canonical_name,
                            provider = client.provider(),
                            error_kind = error.kind(),
                            "tailored questions unavailable, using static templates"
                        );
                        report.fallbacks.push(error);
                    }
                }
            }
        }

        for template in templates {
            if picked.len() >= quota {
                break;
            }
            push_unique(&mut picked, seen, entry, template.clone(), QuestionSource::Template);
        }
        for template in self.taxonomy.category_templates(entry.category) {
            if picked.len() >= quota {
                break;
            }
            let text = render_template(template, &entry.display_name);
            push_unique(&mut picked, seen, entry, text, QuestionSource::Category);
        }
        picked
    }

    async fn request_tailored(
        &self,
        client: &dyn LlmClient,
        timeout: Duration,
        entry: &TechTaxonomyEntry,
        years_experience: Option<f64>,
        wanted: usize,
        chosen: &[String],
    ) -> Result<Vec<String>, IntakeError> {
        let prompt = prompts::llm_question_request(entry, years_experience, wanted, chosen);
        let reply = match tokio::time::timeout(timeout, client.complete(&prompt, timeout)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(error)) => return Err(llm_failure(error)),
            Err(_) => return Err(llm_failure(LlmError::timeout(timeout))),
        };
        parse_question_list(&reply)
            .map_err(|reason| IntakeError::LlmMalformedOutput { reason })
    }
}

fn push_unique(
    picked: &mut Vec<Question>,
    seen: &mut HashSet<String>,
    entry: &TechTaxonomyEntry,
    text: String,
    source: QuestionSource,
) {
    let text = text.trim().to_owned();
    if text.is_empty() || !seen.insert(text.to_lowercase()) {
        return;
    }
    picked.push(Question { technology: entry.canonical_name.clone(), text, source });
}

fn llm_failure(error: LlmError) -> IntakeError {
    match error {
        LlmError::Timeout { timeout_ms } => {
            IntakeError::LlmTimeout { timeout_secs: timeout_ms.div_ceil(1000) }
        }
        other => IntakeError::LlmMalformedOutput { reason: other.to_string() },
    }
}

/// Accepts a JSON array of strings (optionally fenced), or a numbered or
/// bulleted list. Unmarked lines count only when they end with `?`.
pub fn parse_question_list(raw: &str) -> Result<Vec<String>, String> {
    let text = strip_json_fences(raw);
    if text.starts_with('[') {
        let parsed: Vec<String> = serde_json::from_str(text)
            .map_err(|error| format!("invalid JSON question array: {error}"))?;
        let questions: Vec<String> =
            parsed.into_iter().map(|q| q.trim().to_owned()).filter(|q| !q.is_empty()).collect();
        if questions.is_empty() {
            return Err("JSON question array was empty".to_owned());
        }
        return Ok(questions);
    }

    let mut marked = Vec::new();
    let mut unmarked = Vec::new();
    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        match strip_list_marker(line) {
            Some(rest) if !rest.is_empty() => marked.push(rest.to_owned()),
            Some(_) => {}
            None if line.ends_with('?') => unmarked.push(line.to_owned()),
            None => {}
        }
    }
    let questions = if marked.is_empty() { unmarked } else { marked };
    if questions.is_empty() {
        return Err("no questions found in completion".to_owned());
    }
    Ok(questions)
}

fn strip_json_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn strip_list_marker(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix(['-', '*', '•']) {
        return Some(rest.trim());
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    rest.strip_prefix(['.', ')', ':']).map(str::trim)
}
