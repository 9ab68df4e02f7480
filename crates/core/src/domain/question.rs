use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSource {
    /// Taken from the technology's own templates.
    Template,
    /// Rendered from the category fallback templates.
    Category,
    Llm,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub technology: String,
    pub text: String,
    pub source: QuestionSource,
}

/// Screening questions for one session, fixed once generated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl QuestionSet {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }

    pub fn count_for(&self, technology: &str) -> usize {
        self.questions.iter().filter(|question| question.technology == technology).count()
    }

    pub fn technologies(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for question in &self.questions {
            if !seen.contains(&question.technology.as_str()) {
                seen.push(question.technology.as_str());
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::{Question, QuestionSet, QuestionSource};

    #[test]
    fn counts_questions_per_technology_in_order() {
        let set = QuestionSet::new(vec![
            Question {
                technology: "go".to_owned(),
                text: "How do goroutines differ from threads?".to_owned(),
                source: QuestionSource::Template,
            },
            Question {
                technology: "redis".to_owned(),
                text: "When would you pick Redis streams?".to_owned(),
                source: QuestionSource::Llm,
            },
            Question {
                technology: "go".to_owned(),
                text: "How do you cancel work with context?".to_owned(),
                source: QuestionSource::Category,
            },
        ]);

        assert_eq!(set.len(), 3);
        assert_eq!(set.count_for("go"), 2);
        assert_eq!(set.technologies(), vec!["go", "redis"]);
        assert_eq!(set.get(1).map(|question| question.source), Some(QuestionSource::Llm));
        assert!(set.get(3).is_none());
    }
}
