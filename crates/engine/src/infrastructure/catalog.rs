//! JSON-index backed operator catalog.
//!
//! The index is produced offline by the asset indexer and loaded once at
//! startup. After loading, the catalog is immutable; lookups never create
//! entries.
//!
//! ```json
//! {
//!   "operators": {
//!     "char_002_amiya": {
//!       "names": ["Amiya"],
//!       "skins": {
//!         "default": {
//!           "base":   {"Front": {"atlas": "...", "png": "...", "skel": "...", "animations": ["Move"]}},
//!           "battle": {"Front": {...}, "Back": {...}}
//!         }
//!       }
//!     }
//!   },
//!   "enemies": { ... }
//! }
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use chibibot_domain::{Facing, Faction, Stance};

use super::fuzzy::rank_matches;
use super::ports::{CatalogError, NameMatch, OperatorCatalog, OperatorRecord, SkinRecord, SpineAssets};

const MAX_SUGGESTIONS: usize = 5;

#[derive(Debug, Default, Deserialize)]
pub struct CatalogIndex {
    #[serde(default)]
    pub operators: BTreeMap<String, IndexEntry>,
    #[serde(default)]
    pub enemies: BTreeMap<String, IndexEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IndexEntry {
    /// Human names, canonical first.
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub skins: BTreeMap<String, SkinRecord>,
}

pub struct AssetCatalog {
    operators: FactionCatalog,
    enemies: FactionCatalog,
}

impl AssetCatalog {
    pub fn from_index(index: CatalogIndex) -> Self {
        let catalog = Self {
            operators: FactionCatalog::build(index.operators),
            enemies: FactionCatalog::build(index.enemies),
        };
        tracing::info!(
            operators = catalog.operators.ids.len(),
            enemies = catalog.enemies.ids.len(),
            "Operator catalog loaded"
        );
        catalog
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let index: CatalogIndex =
            serde_json::from_str(json).map_err(|e| CatalogError::Load(e.to_string()))?;
        Ok(Self::from_index(index))
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CatalogError::Load(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    fn faction(&self, faction: Faction) -> &FactionCatalog {
        match faction {
            Faction::Operator => &self.operators,
            Faction::Enemy => &self.enemies,
        }
    }
}

impl OperatorCatalog for AssetCatalog {
    fn operator(
        &self,
        operator_id: &str,
        faction: Faction,
    ) -> Result<Arc<OperatorRecord>, CatalogError> {
        self.faction(faction)
            .records
            .get(operator_id)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownOperator(operator_id.to_string()))
    }

    fn operator_ids(&self, faction: Faction) -> Vec<String> {
        self.faction(faction).ids.clone()
    }

    fn resolve(
        &self,
        operator_id: &str,
        faction: Faction,
        skin: &str,
        stance: Stance,
        facing: Facing,
    ) -> Result<SpineAssets, CatalogError> {
        let record = self.operator(operator_id, faction)?;
        let skin_record = record
            .skins
            .get(skin)
            .ok_or_else(|| CatalogError::UnknownSkin(skin.to_string()))?;
        if !skin_record.has_stance(stance) {
            return Err(CatalogError::MissingStance(stance));
        }
        skin_record
            .assets(stance, facing)
            .cloned()
            .ok_or(CatalogError::MissingFacing { stance, facing })
    }

    fn contains(
        &self,
        operator_id: &str,
        faction: Faction,
        skin: &str,
        stance: Stance,
        facing: Facing,
        animations: &[String],
    ) -> Result<(), CatalogError> {
        let assets = self.resolve(operator_id, faction, skin, stance, facing)?;
        match animations.iter().find(|a| !assets.animations.contains(a)) {
            Some(missing) => Err(CatalogError::MissingAnimation(missing.clone())),
            None => Ok(()),
        }
    }

    fn resolve_name(&self, name: &str, faction: Faction) -> NameMatch {
        self.faction(faction).resolve_name(name)
    }
}

struct FactionCatalog {
    records: HashMap<String, Arc<OperatorRecord>>,
    ids: Vec<String>,
    exact: HashMap<String, Vec<String>>,
    folded: HashMap<String, Vec<String>>,
    all_names: Vec<String>,
}

impl FactionCatalog {
    fn build(entries: BTreeMap<String, IndexEntry>) -> Self {
        let mut records = HashMap::new();
        let mut ids = Vec::new();
        let mut exact: HashMap<String, Vec<String>> = HashMap::new();
        let mut folded: HashMap<String, Vec<String>> = HashMap::new();
        let mut all_names = Vec::new();

        for (id, entry) in entries {
            let names = if entry.names.is_empty() {
                vec![id.clone()]
            } else {
                entry.names
            };
            for name in &names {
                push_unique(exact.entry(name.clone()).or_default(), &id);
                push_unique(folded.entry(name.to_lowercase()).or_default(), &id);
                all_names.push(name.clone());
            }
            ids.push(id.clone());
            records.insert(
                id.clone(),
                Arc::new(OperatorRecord {
                    operator_id: id,
                    display_name: names[0].clone(),
                    skins: entry.skins,
                }),
            );
        }
        all_names.sort();
        all_names.dedup();

        Self {
            records,
            ids,
            exact,
            folded,
            all_names,
        }
    }

    fn resolve_name(&self, name: &str) -> NameMatch {
        let candidates = match self.exact.get(name) {
            Some(ids) => Some(ids),
            None => self.folded.get(&name.to_lowercase()),
        };
        if let Some([only]) = candidates.map(Vec::as_slice) {
            return NameMatch::Found(only.clone());
        }

        let mut seen = HashSet::new();
        let mut suggestions = Vec::new();
        'outer: for matched in rank_matches(name, &self.all_names) {
            for id in self.exact.get(matched).into_iter().flatten() {
                if seen.insert(id.as_str()) {
                    if let Some(record) = self.records.get(id) {
                        suggestions.push(record.display_name.clone());
                    }
                }
                if suggestions.len() >= MAX_SUGGESTIONS {
                    break 'outer;
                }
            }
        }
        NameMatch::Suggestions(suggestions)
    }
}

fn push_unique(ids: &mut Vec<String>, id: &str) {
    if !ids.iter().any(|existing| existing == id) {
        ids.push(id.to_string());
    }
}
