use std::collections::HashMap;

use yangfold::{Format, ModuleProvider, ModuleSource};

/// Provider backed by an in-memory map, standing in for the embedding
/// application's module lookup.
pub struct MapProvider {
    sources: HashMap<String, String>,
}

impl MapProvider {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        MapProvider {
            sources: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl ModuleProvider for MapProvider {
    fn retrieve(&self, name: &str, _revision: Option<&str>) -> Option<ModuleSource> {
        self.sources.get(name).map(|text| ModuleSource {
            text: text.clone(),
            format: Format::Yang,
        })
    }
}
