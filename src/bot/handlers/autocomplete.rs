//! Autocomplete handlers for Discord slash command parameters.

use crate::{
    bot::BotData,
    config::SensorCatalog,
    core::i18n::SUPPORTED_LANGUAGES,
    errors::Error,
};

/// Sensor ids from the catalog containing `partial` (case-insensitive), sorted,
/// at most 25 (Discord's limit).
#[must_use]
pub fn matching_sensor_ids(catalog: &SensorCatalog, partial: &str) -> Vec<String> {
    let partial_lower = partial.to_lowercase();
    let mut matching: Vec<String> = catalog
        .sensors()
        .filter(|(id, sensor)| {
            id.to_lowercase().contains(&partial_lower)
                || sensor.display_name.to_lowercase().contains(&partial_lower)
        })
        .map(|(id, _)| id.to_string())
        .collect();
    matching.sort();
    matching.truncate(25);
    matching
}

/// Provides autocomplete suggestions for sensor ids.
pub async fn autocomplete_sensor_id(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    matching_sensor_ids(&ctx.data().catalog, partial)
}

/// Provides autocomplete suggestions for page ids.
pub async fn autocomplete_page_id(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let partial_lower = partial.to_lowercase();
    ctx.data()
        .catalog
        .page_summaries()
        .into_iter()
        .filter(|page| page.id.to_lowercase().contains(&partial_lower))
        .map(|page| page.id)
        .take(25)
        .collect()
}

/// Supported language codes starting with `partial`
#[must_use]
pub fn matching_languages(partial: &str) -> Vec<String> {
    let partial_lower = partial.trim().to_lowercase();
    SUPPORTED_LANGUAGES
        .iter()
        .filter(|code| code.starts_with(&partial_lower))
        .map(|code| (*code).to_string())
        .collect()
}

/// Provides autocomplete suggestions for language codes.
pub async fn autocomplete_language(
    _ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    matching_languages(partial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_catalog;

    #[test]
    fn test_matches_ids_and_display_names() {
        let catalog = sample_catalog();
        assert_eq!(matching_sensor_ids(&catalog, ""), vec!["OverheadTank", "Reservoir"]);
        assert_eq!(matching_sensor_ids(&catalog, "res"), vec!["Reservoir"]);
        assert_eq!(matching_sensor_ids(&catalog, "overhead t"), vec!["OverheadTank"]);
        assert!(matching_sensor_ids(&catalog, "pump").is_empty());
    }

    #[test]
    fn test_language_suggestions() {
        assert_eq!(matching_languages("").len(), 7);
        assert_eq!(matching_languages("t"), vec!["te", "ta"]);
        assert_eq!(matching_languages("SW"), vec!["sw"]);
        assert!(matching_languages("de").is_empty());
    }
}
