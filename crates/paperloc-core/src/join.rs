use std::collections::HashMap;

use crate::{HueLocation, LocalizedEntity, Locatable};

/// Pair every entity with all locations sharing its `(id, source_path)`.
///
/// Output has one element per input entity, in input order. Each entity's
/// locations keep their relative order from `locations`. Entities without
/// any location get an empty list.
pub fn join<E: Locatable>(
    entities: Vec<E>,
    locations: &[HueLocation],
) -> Vec<LocalizedEntity<E>> {
    let mut by_identity: HashMap<(&str, &str), Vec<&HueLocation>> = HashMap::new();
    for location in locations {
        by_identity
            .entry((location.entity_id.as_str(), location.source_path.as_str()))
            .or_default()
            .push(location);
    }

    entities
        .into_iter()
        .map(|entity| {
            let locations: Vec<HueLocation> = by_identity
                .get(&(entity.id(), entity.source_path()))
                .map(|found| found.iter().map(|&l| l.clone()).collect())
                .unwrap_or_default();
            LocalizedEntity { entity, locations }
        })
        .collect()
}
