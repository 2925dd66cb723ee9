//! Taxonomy table loading and normalization.
//!
//! Each row of the taxonomy CSV becomes one output category. The table must
//! provide `id` and `family` columns; `genus` and `species` are optional and
//! default to "Unspecified" and "sp." respectively. An entry with an
//! unspecified genus can never carry a concrete species epithet, so species
//! is forced back to "sp." whenever genus normalizes to "Unspecified".

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::TreedError;

/// Genus placeholder used when the taxonomy table does not specify one.
pub const UNSPECIFIED_GENUS: &str = "Unspecified";

/// Species placeholder used when the taxonomy table does not specify one.
pub const UNSPECIFIED_SPECIES: &str = "sp.";

/// One taxonomic entry. Assigned the identifier used to tag annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Identifier, taken verbatim from the taxonomy row.
    pub id: i64,
    /// Taxonomic family. Always present.
    pub family: String,
    /// Genus, or "Unspecified".
    pub genus: String,
    /// Species epithet, or "sp.".
    pub species: String,
}

/// Lookup from the species identifier used by vector features to the
/// category identifier used in the output.
///
/// Both values currently come from the same taxonomy `id` column; the two
/// roles are kept distinct in the type so a future public species code can
/// slot in without touching callers.
pub type SpeciesIndex = HashMap<i64, i64>;

/// Loaded taxonomy: ordered categories plus the species lookup.
#[derive(Debug, Default)]
pub struct Taxonomy {
    /// Categories in source-table order.
    pub categories: Vec<Category>,
    /// Species identifier to category identifier mapping.
    pub species_index: SpeciesIndex,
}

impl Taxonomy {
    /// Loads the taxonomy from a CSV file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Taxonomy, TreedError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            std::io::Error::new(e.kind(), format!("taxonomy CSV {}: {e}", path.display()))
        })?;
        Self::from_reader(file)
    }

    /// Loads the taxonomy from CSV text.
    ///
    /// A row with an empty family fails the whole load, not just that row.
    pub fn from_reader(reader: impl Read) -> Result<Taxonomy, TreedError> {
        let mut csv = csv::Reader::from_reader(reader);

        let headers = csv.headers()?.clone();
        let column = |name: &str| headers.iter().position(|h| h == name);

        let id_idx = column("id");
        let family_idx = column("family");
        let missing: Vec<&str> = [("id", id_idx), ("family", family_idx)]
            .iter()
            .filter(|(_, idx)| idx.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(TreedError::Schema(format!(
                "taxonomy CSV missing required columns: {missing:?}"
            )));
        }
        let (id_idx, family_idx) = (id_idx.unwrap_or_default(), family_idx.unwrap_or_default());

        let genus_idx = column("genus");
        if genus_idx.is_none() {
            log::warn!(
                "No genus column found in taxonomy CSV. Using '{UNSPECIFIED_GENUS}' as default genus."
            );
        }
        let species_idx = column("species");
        if species_idx.is_none() {
            log::warn!(
                "No species column found in taxonomy CSV. Using '{UNSPECIFIED_SPECIES}' as default species."
            );
        }

        let mut taxonomy = Taxonomy::default();
        for record in csv.records() {
            let record = record?;
            let cell = |idx: Option<usize>| {
                idx.and_then(|i| record.get(i)).map(str::trim).unwrap_or("")
            };

            let raw_id = cell(Some(id_idx));
            let id: i64 = raw_id.parse().map_err(|_| {
                TreedError::Validation(format!("taxonomy id '{raw_id}' is not an integer"))
            })?;

            let family = cell(Some(family_idx));
            if family.is_empty() {
                return Err(TreedError::Validation(format!(
                    "missing family for taxonomy ID {id}; family is required"
                )));
            }

            let mut genus = cell(genus_idx);
            if genus.is_empty() || genus.eq_ignore_ascii_case(UNSPECIFIED_GENUS) {
                genus = UNSPECIFIED_GENUS;
            }

            let mut species = cell(species_idx);
            if species.is_empty() {
                species = UNSPECIFIED_SPECIES;
            }
            if genus == UNSPECIFIED_GENUS && species != UNSPECIFIED_SPECIES {
                log::warn!(
                    "Setting species to '{UNSPECIFIED_SPECIES}' for entry with {UNSPECIFIED_GENUS} genus (ID: {id})"
                );
                species = UNSPECIFIED_SPECIES;
            }

            taxonomy.categories.push(Category {
                id,
                family: family.to_string(),
                genus: genus.to_string(),
                species: species.to_string(),
            });
            // The species identifier referenced by vector features and the
            // output category identifier are the same value today.
            taxonomy.species_index.insert(id, id);
        }

        log::info!(
            "Loaded taxonomy data with {} species",
            taxonomy.categories.len()
        );
        Ok(taxonomy)
    }

    /// Category identifier for the given species identifier, if known.
    pub fn category_for_species(&self, species_id: i64) -> Option<i64> {
        self.species_index.get(&species_id).copied()
    }
}
