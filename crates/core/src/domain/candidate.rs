use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::flows::Field;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    pub technology: String,
    pub question: String,
    pub answer: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Complete,
    Incomplete,
}

impl CompletionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Incomplete => "incomplete",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Assistant,
    Candidate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub speaker: Speaker,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// Structured intake data. A field only holds a value after its validator accepted it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub years_experience: Option<f64>,
    pub desired_roles: Vec<String>,
    /// Canonical technology names in order of first mention.
    pub tech_stack: Vec<String>,
    pub answers: Vec<AnsweredQuestion>,
    /// Raw transcript of the session. Not part of completeness.
    #[serde(default)]
    pub conversation: Vec<ConversationEntry>,
}

impl CandidateRecord {
    pub fn is_filled(&self, field: Field) -> bool {
        match field {
            Field::Name => self.name.is_some(),
            Field::Email => self.email.is_some(),
            Field::Phone => self.phone.is_some(),
            Field::YearsExperience => self.years_experience.is_some(),
            Field::DesiredRoles => !self.desired_roles.is_empty(),
            Field::TechStack => !self.tech_stack.is_empty(),
        }
    }

    pub fn missing_fields(&self) -> Vec<Field> {
        Field::ORDER.into_iter().filter(|field| !self.is_filled(*field)).collect()
    }

    pub fn filled_fields(&self) -> Vec<Field> {
        Field::ORDER.into_iter().filter(|field| self.is_filled(*field)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.filled_fields().is_empty() && self.answers.is_empty()
    }

    /// Appends technologies not yet held and returns how many were new.
    pub fn merge_technologies<I>(&mut self, technologies: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut added = 0;
        for technology in technologies {
            if !self.tech_stack.contains(&technology) {
                self.tech_stack.push(technology);
                added += 1;
            }
        }
        added
    }

    /// Distinct technologies with at least one answer, in answer order.
    pub fn answered_technologies(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for answer in &self.answers {
            if !seen.contains(&answer.technology.as_str()) {
                seen.push(answer.technology.as_str());
            }
        }
        seen
    }

    pub fn completion_status(&self) -> CompletionStatus {
        let every_technology_answered = self
            .tech_stack
            .iter()
            .all(|technology| self.answers.iter().any(|answer| &answer.technology == technology));

        if self.missing_fields().is_empty() && !self.answers.is_empty() && every_technology_answered
        {
            CompletionStatus::Complete
        } else {
            CompletionStatus::Incomplete
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AnsweredQuestion, CandidateRecord, CompletionStatus};
    use crate::flows::Field;

    fn answered(technology: &str) -> AnsweredQuestion {
        AnsweredQuestion {
            technology: technology.to_owned(),
            question: format!("What do you like about {technology}?"),
            answer: "It is fast.".to_owned(),
        }
    }

    fn full_record() -> CandidateRecord {
        CandidateRecord {
            name: Some("Ada Lovelace".to_owned()),
            email: Some("ada@example.com".to_owned()),
            phone: Some("15551234567".to_owned()),
            years_experience: Some(3.0),
            desired_roles: vec!["Backend Engineer".to_owned()],
            tech_stack: vec!["python".to_owned(), "django".to_owned()],
            answers: Vec::new(),
            conversation: Vec::new(),
        }
    }

    #[test]
    fn missing_fields_follow_gathering_order() {
        let record = CandidateRecord {
            email: Some("ada@example.com".to_owned()),
            ..CandidateRecord::default()
        };

        assert_eq!(
            record.missing_fields(),
            vec![
                Field::Name,
                Field::Phone,
                Field::YearsExperience,
                Field::DesiredRoles,
                Field::TechStack
            ]
        );
        assert!(!record.is_empty());
        assert!(CandidateRecord::default().is_empty());
    }

    #[test]
    fn merge_keeps_first_mention_order_without_duplicates() {
        let mut record = CandidateRecord::default();
        let added = record.merge_technologies(["rust".to_owned(), "aws".to_owned()]);
        let again = record.merge_technologies(["aws".to_owned(), "docker".to_owned()]);

        assert_eq!(added, 2);
        assert_eq!(again, 1);
        assert_eq!(record.tech_stack, vec!["rust", "aws", "docker"]);
    }

    #[test]
    fn completion_requires_answers_for_every_technology() {
        let mut record = full_record();
        assert_eq!(record.completion_status(), CompletionStatus::Incomplete);

        record.answers.push(answered("python"));
        assert_eq!(record.completion_status(), CompletionStatus::Incomplete);

        record.answers.push(answered("django"));
        record.answers.push(answered("python"));
        assert_eq!(record.completion_status(), CompletionStatus::Complete);
        assert_eq!(record.answered_technologies(), vec!["python", "django"]);
    }
}
