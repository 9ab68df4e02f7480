//! Everything the assistant says. Kept in one place so wording changes never
//! touch the flow logic.

use talentscout_core::domain::candidate::CandidateRecord;
use talentscout_core::domain::question::Question;
use talentscout_core::errors::IntakeError;
use talentscout_core::flows::Field;
use talentscout_core::taxonomy::{TechTaxonomy, TechTaxonomyEntry};
use talentscout_core::validators::{ValidationFailure, MAX_YEARS_EXPERIENCE, MIN_YEARS_EXPERIENCE};

pub const EXIT_HINT: &str = "You can type 'exit', 'quit', or 'bye' at any time to end the conversation.";
pub const SESSION_ENDED: &str =
    "This conversation has ended. Please start a new session if you'd like to continue.";
pub const CONFIRMATION_REPROMPT: &str =
    "Please reply 'yes' if these details are correct, or 'no' to start over.";

pub fn greeting(app_name: &str) -> String {
    format!(
        "Hello! Welcome to {app_name}.\n\n\
         I'm here to help streamline your interview process. I'll gather some essential \
         information about your background and then ask a few technical questions based on \
         your expertise. This should take about 5-10 minutes.\n\n\
         {EXIT_HINT}\n\n\
         Ready to get started? Reply with anything to begin."
    )
}

pub fn field_question(field: Field) -> &'static str {
    match field {
        Field::Name => "Could you please tell me your full name?",
        Field::Email => "What's your email address?",
        Field::Phone => "Could you provide your phone number?",
        Field::YearsExperience => {
            "How many years of professional experience do you have in technology?"
        }
        Field::DesiredRoles => {
            "What type of positions are you looking for? (e.g., Software Engineer, Data Scientist, etc.)"
        }
        Field::TechStack => {
            "Could you tell me about your technical expertise? Please list the main programming \
             languages, frameworks, databases, and tools you work with."
        }
    }
}

/// Asks for `field`, acknowledging the value that was just accepted.
pub fn ask_field(field: Field, record: &CandidateRecord) -> String {
    match (field, record.name.as_deref()) {
        (Field::Name, _) => field_question(field).to_owned(),
        (Field::Email, Some(name)) => {
            let first = name.split_whitespace().next().unwrap_or(name);
            format!("Nice to meet you, {first}! {}", field_question(field))
        }
        (Field::TechStack, _) => format!("Perfect! Now, {}", lowercase_first(field_question(field))),
        _ => format!("Thank you! {}", field_question(field)),
    }
}

pub fn clarification(field: Field, failure: &ValidationFailure) -> String {
    let hint = match failure {
        ValidationFailure::EmptyInput => {
            format!("I didn't catch your {}.", field.label())
        }
        ValidationFailure::InvalidName => {
            "That doesn't look like a name. Please use letters only, for example 'Jane Doe'."
                .to_owned()
        }
        ValidationFailure::InvalidEmailFormat => {
            "That email address doesn't look right. Please use the format name@example.com."
                .to_owned()
        }
        ValidationFailure::InvalidPhoneNumber { digits } => format!(
            "That phone number has {digits} digits. Please enter 10 to 15 digits in international \
             format, for example +1 555 123 4567."
        ),
        ValidationFailure::NotANumber => {
            "Please give your experience as a number of years, for example '3' or '4.5'.".to_owned()
        }
        ValidationFailure::OutOfRangeExperience { .. } => format!(
            "Please enter a number of years between {MIN_YEARS_EXPERIENCE} and {MAX_YEARS_EXPERIENCE}."
        ),
        ValidationFailure::NoRolesGiven => {
            "Please name at least one position you're interested in.".to_owned()
        }
        ValidationFailure::RoleTooLong => {
            "Please keep each position title short, and separate several with commas.".to_owned()
        }
        ValidationFailure::UnknownTechnology { tokens } => format!(
            "I don't recognise {}. Please list technologies by name, for example: Python, React, \
             PostgreSQL, Docker.",
            quote_list(tokens)
        ),
    };
    match failure {
        ValidationFailure::EmptyInput => format!("{hint} {}", field_question(field)),
        _ => hint,
    }
}

pub fn unresolved_technologies(
    unresolved: &[String],
    record: &CandidateRecord,
    taxonomy: &TechTaxonomy,
) -> String {
    format!(
        "Got it, so far I have: {}. I couldn't identify {}. Could you re-enter {} using a common \
         name? Reply 'done' if the list above is complete.",
        display_names(&record.tech_stack, taxonomy).join(", "),
        quote_list(unresolved),
        if unresolved.len() == 1 { "it" } else { "them" }
    )
}

pub fn summary(record: &CandidateRecord, taxonomy: &TechTaxonomy) -> String {
    let years = record
        .years_experience
        .map(format_years)
        .unwrap_or_else(|| "not provided".to_owned());
    format!(
        "Great! I have all your basic information. Please confirm the details below:\n\n\
         - Name: {}\n\
         - Email: {}\n\
         - Phone: {}\n\
         - Experience: {years}\n\
         - Desired positions: {}\n\
         - Tech stack: {}\n\n\
         Is everything correct? (yes/no)",
        record.name.as_deref().unwrap_or("not provided"),
        record.email.as_deref().unwrap_or("not provided"),
        record.phone.as_deref().unwrap_or("not provided"),
        record.desired_roles.join(", "),
        display_names(&record.tech_stack, taxonomy).join(", "),
    )
}

pub const RESTART_NOTICE: &str = "No problem, let's start over with a fresh record.";

pub fn technical_intro(total: usize) -> String {
    format!(
        "Thank you for confirming! Now I'd like to ask you {total} technical question{} to better \
         understand your expertise.",
        if total == 1 { "" } else { "s" }
    )
}

pub fn ask_question(index: usize, total: usize, question: &Question, taxonomy: &TechTaxonomy) -> String {
    let technology = taxonomy
        .get(&question.technology)
        .map(|entry| entry.display_name.as_str())
        .unwrap_or(question.technology.as_str());
    format!("Question {} of {total} ({technology}): {}", index + 1, question.text)
}

pub fn answer_missing() -> &'static str {
    "Please share your answer, even a short one, before we move on."
}

pub fn farewell(completed: bool) -> String {
    let opening = if completed {
        "Thank you for completing the screening process! Your information has been recorded \
         and our recruitment team will review your profile carefully."
    } else {
        "Thank you for your time! Our recruitment team will review the information you shared \
         so far."
    };
    format!(
        "{opening}\n\n\
         Next steps:\n\
         - Our team will evaluate your responses within 24-48 hours\n\
         - If you're a good fit, we'll contact you within 3-5 business days\n\
         - Keep an eye on your email and phone for updates\n\n\
         Thank you for your interest in opportunities with TalentScout. Have a great day and \
         good luck with your job search!"
    )
}

pub fn persistence_apology() -> &'static str {
    IntakeError::PersistenceFailure(String::new()).user_message()
}

/// Prompt for tailored questions about one technology.
pub fn llm_question_request(
    entry: &TechTaxonomyEntry,
    years_experience: Option<f64>,
    wanted: usize,
    already_chosen: &[String],
) -> String {
    let mut prompt = format!(
        "Generate {wanted} relevant technical screening question{} about {} ({}) for a candidate \
         with {} of experience.\n\n\
         QUESTION GUIDELINES:\n\
         - Mix conceptual and practical questions\n\
         - Include at least one problem-solving scenario\n\
         - Avoid trick questions; keep the tone conversational\n\n\
         EXPERIENCE LEVEL CONSIDERATIONS:\n\
         - 0-2 years: fundamentals, basic concepts, simple scenarios\n\
         - 3-5 years: intermediate concepts, design patterns, best practices\n\
         - 6+ years: advanced topics, architecture decisions, leadership scenarios\n\
         Target level: {}.\n",
        if wanted == 1 { "" } else { "s" },
        entry.display_name,
        entry.category.label(),
        years_experience.map(format_years).unwrap_or_else(|| "an unknown amount".to_owned()),
        experience_band(years_experience),
    );
    if !already_chosen.is_empty() {
        prompt.push_str("\nDo not repeat these questions:\n");
        for question in already_chosen {
            prompt.push_str("- ");
            prompt.push_str(question);
            prompt.push('\n');
        }
    }
    prompt.push_str(
        "\nReply with a JSON array of strings, one question per element, and nothing else.",
    );
    prompt
}

pub fn experience_band(years: Option<f64>) -> &'static str {
    match years {
        Some(years) if years >= 6.0 => "6+ years",
        Some(years) if years >= 3.0 => "3-5 years",
        Some(_) => "0-2 years",
        None => "3-5 years",
    }
}

fn format_years(years: f64) -> String {
    let unit = if (years - 1.0).abs() < f64::EPSILON { "year" } else { "years" };
    if years.fract() == 0.0 {
        format!("{years:.0} {unit}")
    } else {
        format!("{years} {unit}")
    }
}

fn display_names(canonical: &[String], taxonomy: &TechTaxonomy) -> Vec<String> {
    canonical
        .iter()
        .map(|name| {
            taxonomy.get(name).map(|entry| entry.display_name.clone()).unwrap_or_else(|| name.clone())
        })
        .collect()
}

fn quote_list(tokens: &[String]) -> String {
    tokens.iter().map(|token| format!("\"{token}\"")).collect::<Vec<_>>().join(", ")
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
