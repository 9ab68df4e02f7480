use serde::Serialize;
use talentscout_core::config::{AppConfig, LoadOptions};
use talentscout_core::taxonomy::{TechCategory, TechTaxonomy};

use crate::bootstrap::load_taxonomy;
use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct CategoryListing<'a> {
    category: &'static str,
    technologies: Vec<TechnologyListing<'a>>,
}

#[derive(Debug, Serialize)]
struct TechnologyListing<'a> {
    name: &'a str,
    display_name: &'a str,
    aliases: &'a [String],
    templates: usize,
}

pub fn run(json_output: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "taxonomy",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let taxonomy = match load_taxonomy(&config) {
        Ok(taxonomy) => taxonomy,
        Err(error) => return CommandResult::failure("taxonomy", "taxonomy", error.to_string(), 7),
    };

    let listing = group_by_category(&taxonomy);
    if json_output {
        return CommandResult::document(
            "taxonomy",
            format!("{} technologies", taxonomy.len()),
            &listing,
        );
    }

    CommandResult { exit_code: 0, output: render_human(&listing) }
}

fn group_by_category(taxonomy: &TechTaxonomy) -> Vec<CategoryListing<'_>> {
    TechCategory::ALL
        .into_iter()
        .map(|category| CategoryListing {
            category: category.as_str(),
            technologies: taxonomy
                .entries_in(category)
                .map(|entry| TechnologyListing {
                    name: &entry.canonical_name,
                    display_name: &entry.display_name,
                    aliases: &entry.aliases,
                    templates: entry.question_templates.len(),
                })
                .collect(),
        })
        .filter(|listing| !listing.technologies.is_empty())
        .collect()
}

fn render_human(listing: &[CategoryListing<'_>]) -> String {
    listing
        .iter()
        .map(|group| {
            let names: Vec<&str> =
                group.technologies.iter().map(|technology| technology.display_name).collect();
            format!("{} ({}): {}", group.category, names.len(), names.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
