//! Technology registry: aliases, categories, and screening question templates.
//!
//! The registry is built once at startup, validated, and then shared read-only
//! (`Arc<TechTaxonomy>`) by every session. New technologies are added as data in
//! a TOML document with the same schema as the built-in `data/taxonomy.toml`.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const BUILTIN_TAXONOMY: &str = include_str!("../data/taxonomy.toml");
pub const TECHNOLOGY_PLACEHOLDER: &str = "{technology}";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechCategory {
    Language,
    Framework,
    Database,
    Cloud,
    Tool,
}

impl TechCategory {
    pub const ALL: [TechCategory; 5] = [
        TechCategory::Language,
        TechCategory::Framework,
        TechCategory::Database,
        TechCategory::Cloud,
        TechCategory::Tool,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Language => "language",
            Self::Framework => "framework",
            Self::Database => "database",
            Self::Cloud => "cloud",
            Self::Tool => "tool",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Language => "programming language",
            Self::Framework => "framework",
            Self::Database => "database",
            Self::Cloud => "cloud platform",
            Self::Tool => "tool",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechTaxonomyEntry {
    pub canonical_name: String,
    pub display_name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub category: TechCategory,
    #[serde(default)]
    pub question_templates: Vec<String>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TaxonomyError {
    #[error("failed to read taxonomy file {path}: {message}")]
    Io { path: PathBuf, message: String },
    #[error("failed to parse taxonomy document: {0}")]
    Parse(String),
    #[error("taxonomy entry has an empty canonical name")]
    EmptyCanonicalName,
    #[error("canonical name `{0}` appears more than once")]
    DuplicateCanonicalName(String),
    #[error("alias `{alias}` is claimed by both `{first}` and `{second}`")]
    AliasConflict { alias: String, first: String, second: String },
    #[error("`{canonical_name}` has no templates and category {category:?} has no fallback")]
    MissingTemplates { canonical_name: String, category: TechCategory },
    #[error("category template for {category:?} is missing the {{technology}} placeholder")]
    MissingPlaceholder { category: TechCategory },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TaxonomyDocument {
    #[serde(default)]
    category_templates: CategoryTemplatesDocument,
    #[serde(default)]
    technology: Vec<TechTaxonomyEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CategoryTemplatesDocument {
    #[serde(default)]
    language: Vec<String>,
    #[serde(default)]
    framework: Vec<String>,
    #[serde(default)]
    database: Vec<String>,
    #[serde(default)]
    cloud: Vec<String>,
    #[serde(default)]
    tool: Vec<String>,
}

impl CategoryTemplatesDocument {
    fn into_map(self) -> BTreeMap<TechCategory, Vec<String>> {
        BTreeMap::from([
            (TechCategory::Language, self.language),
            (TechCategory::Framework, self.framework),
            (TechCategory::Database, self.database),
            (TechCategory::Cloud, self.cloud),
            (TechCategory::Tool, self.tool),
        ])
    }
}

#[derive(Clone, Debug)]
pub struct TechTaxonomy {
    entries: Vec<TechTaxonomyEntry>,
    index: HashMap<String, usize>,
    category_templates: BTreeMap<TechCategory, Vec<String>>,
}

impl TechTaxonomy {
    pub fn builtin() -> Result<Self, TaxonomyError> {
        Self::from_toml_str(BUILTIN_TAXONOMY)
    }

    /// Loads the document at `path`, or the built-in taxonomy when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, TaxonomyError> {
        match path {
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|error| TaxonomyError::Io {
                    path: path.to_path_buf(),
                    message: error.to_string(),
                })?;
                Self::from_toml_str(&raw)
            }
            None => Self::builtin(),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, TaxonomyError> {
        let document: TaxonomyDocument =
            toml::from_str(raw).map_err(|error| TaxonomyError::Parse(error.to_string()))?;
        Self::from_parts(document.technology, document.category_templates.into_map())
    }

    pub fn from_parts(
        entries: Vec<TechTaxonomyEntry>,
        category_templates: BTreeMap<TechCategory, Vec<String>>,
    ) -> Result<Self, TaxonomyError> {
        for (category, templates) in &category_templates {
            if templates.iter().any(|template| !template.contains(TECHNOLOGY_PLACEHOLDER)) {
                return Err(TaxonomyError::MissingPlaceholder { category: *category });
            }
        }

        let mut index: HashMap<String, usize> = HashMap::new();
        let mut normalized_entries = Vec::with_capacity(entries.len());

        for (position, mut entry) in entries.into_iter().enumerate() {
            let canonical = normalize_alias(&entry.canonical_name);
            if canonical.is_empty() {
                return Err(TaxonomyError::EmptyCanonicalName);
            }
            if normalized_entries
                .iter()
                .any(|existing: &TechTaxonomyEntry| existing.canonical_name == canonical)
            {
                return Err(TaxonomyError::DuplicateCanonicalName(canonical));
            }

            let has_fallback = category_templates
                .get(&entry.category)
                .is_some_and(|templates| !templates.is_empty());
            if entry.question_templates.is_empty() && !has_fallback {
                return Err(TaxonomyError::MissingTemplates {
                    canonical_name: canonical,
                    category: entry.category,
                });
            }

            entry.canonical_name = canonical.clone();
            if entry.display_name.trim().is_empty() {
                entry.display_name = canonical.clone();
            }

            let mut keys = vec![canonical.clone(), normalize_alias(&entry.display_name)];
            keys.extend(entry.aliases.iter().map(|alias| normalize_alias(alias)));
            keys.retain(|key| !key.is_empty());
            keys.dedup();

            for key in keys {
                match index.get(&key) {
                    Some(owner) if *owner == position => {}
                    Some(owner) => {
                        return Err(TaxonomyError::AliasConflict {
                            alias: key,
                            first: normalized_entries
                                .get(*owner)
                                .map(|existing: &TechTaxonomyEntry| existing.canonical_name.clone())
                                .unwrap_or_default(),
                            second: canonical,
                        });
                    }
                    None => {
                        index.insert(key, position);
                    }
                }
            }

            normalized_entries.push(entry);
        }

        Ok(Self { entries: normalized_entries, index, category_templates })
    }

    /// Resolves a canonical name or alias, ignoring case and surrounding punctuation.
    pub fn lookup(&self, name: &str) -> Option<&TechTaxonomyEntry> {
        let key = normalize_alias(name);
        self.index.get(&key).and_then(|position| self.entries.get(*position))
    }

    pub fn get(&self, canonical_name: &str) -> Option<&TechTaxonomyEntry> {
        self.entries.iter().find(|entry| entry.canonical_name == canonical_name)
    }

    pub fn entries(&self) -> &[TechTaxonomyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn category_templates(&self, category: TechCategory) -> &[String] {
        self.category_templates.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn entries_in(&self, category: TechCategory) -> impl Iterator<Item = &TechTaxonomyEntry> {
        self.entries.iter().filter(move |entry| entry.category == category)
    }
}

pub fn render_template(template: &str, display_name: &str) -> String {
    template.replace(TECHNOLOGY_PLACEHOLDER, display_name)
}

/// Lowercases, collapses whitespace, and strips surrounding punctuation.
/// Trailing `+` and `#` survive so `C++` and `C#` stay distinct from `C`.
pub fn normalize_alias(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    collapsed
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .trim_end_matches(|c: char| !c.is_alphanumeric() && c != '+' && c != '#')
        .to_owned()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{
        normalize_alias, render_template, TaxonomyError, TechCategory, TechTaxonomy,
        TechTaxonomyEntry,
    };
    use crate::validators::validate_tech_stack;

    fn entry(canonical: &str, aliases: &[&str]) -> TechTaxonomyEntry {
        TechTaxonomyEntry {
            canonical_name: canonical.to_owned(),
            display_name: canonical.to_owned(),
            aliases: aliases.iter().map(|alias| (*alias).to_owned()).collect(),
            category: TechCategory::Tool,
            question_templates: vec![format!("What do you use {canonical} for?")],
        }
    }

    #[test]
    fn builtin_taxonomy_loads_and_covers_every_category() {
        let taxonomy = TechTaxonomy::builtin().expect("builtin taxonomy is valid");

        assert!(taxonomy.len() >= 45);
        for category in TechCategory::ALL {
            assert!(taxonomy.entries_in(category).count() > 0, "{category:?} has entries");
            assert!(taxonomy.category_templates(category).len() >= 5);
        }
        for entry in taxonomy.entries() {
            assert!(entry.question_templates.len() >= 3, "{} has templates", entry.canonical_name);
        }
    }

    #[test]
    fn lookup_is_case_insensitive_and_trims_punctuation() {
        let taxonomy = TechTaxonomy::builtin().expect("builtin taxonomy");

        let by_alias = taxonomy.lookup("  Postgres. ").expect("postgres alias");
        assert_eq!(by_alias.canonical_name, "postgresql");
        assert_eq!(taxonomy.lookup("(K8S)").map(|e| e.canonical_name.as_str()), Some("kubernetes"));
        assert_eq!(taxonomy.lookup("AWS").map(|e| e.canonical_name.as_str()), Some("aws"));
        assert_eq!(taxonomy.lookup("Spring   Boot").map(|e| e.display_name.as_str()), Some("Spring Boot"));
        assert!(taxonomy.lookup("cobolx").is_none());
    }

    #[test]
    fn every_builtin_name_survives_tech_stack_parsing() {
        let taxonomy = TechTaxonomy::builtin().expect("builtin taxonomy");

        for entry in taxonomy.entries() {
            let names = [&entry.canonical_name, &entry.display_name]
                .into_iter()
                .chain(entry.aliases.iter());
            for name in names {
                let parsed = validate_tech_stack(name, &taxonomy).expect("alias parses");
                assert_eq!(parsed.accepted, vec![entry.canonical_name.clone()], "{name:?}");
                assert!(parsed.unresolved.is_empty(), "{name:?} left {:?}", parsed.unresolved);
            }
        }
    }

    #[test]
    fn hosting_platforms_are_not_git() {
        let taxonomy = TechTaxonomy::builtin().expect("builtin taxonomy");

        assert_eq!(taxonomy.lookup("GitHub").map(|e| e.canonical_name.as_str()), Some("github"));
        assert_eq!(taxonomy.lookup("gitlab ci").map(|e| e.canonical_name.as_str()), Some("gitlab"));
        assert!(taxonomy.lookup("bitbucket").is_none());
        assert!(taxonomy.lookup("do droplets").is_none());
    }

    #[test]
    fn trailing_plus_and_hash_stay_significant() {
        let taxonomy = TechTaxonomy::builtin().expect("builtin taxonomy");

        assert_eq!(taxonomy.lookup("C++").map(|e| e.canonical_name.as_str()), Some("cpp"));
        assert_eq!(taxonomy.lookup("c#").map(|e| e.canonical_name.as_str()), Some("csharp"));
        assert!(taxonomy.lookup("c").is_none());
        assert_eq!(normalize_alias("\"Vue.js\","), "vue.js");
    }

    #[test]
    fn duplicate_canonical_names_are_rejected() {
        let error = TechTaxonomy::from_parts(
            vec![entry("git", &[]), entry("Git", &["scm"])],
            BTreeMap::new(),
        )
        .expect_err("duplicate canonical");

        assert_eq!(error, TaxonomyError::DuplicateCanonicalName("git".to_owned()));
    }

    #[test]
    fn alias_conflicts_are_rejected() {
        let error = TechTaxonomy::from_parts(
            vec![entry("docker", &["containers"]), entry("podman", &["Containers"])],
            BTreeMap::new(),
        )
        .expect_err("alias conflict");

        assert_eq!(
            error,
            TaxonomyError::AliasConflict {
                alias: "containers".to_owned(),
                first: "docker".to_owned(),
                second: "podman".to_owned(),
            }
        );
    }

    #[test]
    fn entry_without_templates_needs_category_fallback() {
        let mut bare = entry("nomad", &[]);
        bare.question_templates.clear();

        let error = TechTaxonomy::from_parts(vec![bare.clone()], BTreeMap::new())
            .expect_err("no question material");
        assert!(matches!(error, TaxonomyError::MissingTemplates { .. }));

        let templates = BTreeMap::from([(
            TechCategory::Tool,
            vec!["How do you operate {technology}?".to_owned()],
        )]);
        let taxonomy = TechTaxonomy::from_parts(vec![bare], templates).expect("fallback exists");
        assert_eq!(taxonomy.category_templates(TechCategory::Tool).len(), 1);
    }

    #[test]
    fn new_technology_is_a_data_only_change() {
        let raw = r#"
            [category_templates]
            tool = ["How do you operate {technology}?"]

            [[technology]]
            canonical_name = "nomad"
            display_name = "Nomad"
            category = "tool"
            aliases = ["hashicorp nomad"]
        "#;

        let taxonomy = TechTaxonomy::from_toml_str(raw).expect("custom taxonomy");
        let nomad = taxonomy.lookup("HashiCorp Nomad").expect("alias resolves");
        assert_eq!(nomad.display_name, "Nomad");
        assert_eq!(
            render_template(&taxonomy.category_templates(TechCategory::Tool)[0], "Nomad"),
            "How do you operate Nomad?"
        );
    }

    #[test]
    fn category_templates_must_carry_placeholder() {
        let raw = r#"
            [category_templates]
            cloud = ["Tell me about the cloud."]
        "#;

        let error = TechTaxonomy::from_toml_str(raw).expect_err("placeholder required");
        assert_eq!(error, TaxonomyError::MissingPlaceholder { category: TechCategory::Cloud });
    }

    #[test]
    fn load_reads_override_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("taxonomy.toml");
        std::fs::write(
            &path,
            r#"
                [[technology]]
                canonical_name = "zig"
                display_name = "Zig"
                category = "language"
                question_templates = ["How does comptime work in Zig?"]
            "#,
        )
        .expect("write taxonomy");

        let taxonomy = TechTaxonomy::load(Some(&path)).expect("load override");
        assert_eq!(taxonomy.len(), 1);
        assert!(taxonomy.lookup("zig").is_some());

        let missing = TechTaxonomy::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(missing, Err(TaxonomyError::Io { .. })));
    }
}
