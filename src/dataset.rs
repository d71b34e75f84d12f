//! Loads the reference and candidate features to be matched.
//!
//! Candidate enumeration is not done here: every reference lists its candidates by id in a `pairs` entry.

use {
    crate::errors::DatasetError,
    geomatch_evidence::{Feature, Shape},
    serde::{Deserialize, Serialize},
    std::{collections::HashMap, fs, path::Path},
};

/// The JSON serialization of a dataset.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Dataset {
    #[serde(default)]
    pub references: Vec<Feature>,
    #[serde(default)]
    pub candidates: Vec<Feature>,
    #[serde(default)]
    pub pairs: Vec<Pair>,
}

/// A reference feature id and the ids of its candidates, in frame order.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Pair {
    pub reference: String,
    pub candidates: Vec<String>,
}

/// A reference feature with its resolved candidates, ready to be evaluated.
#[derive(Debug, Clone)]
pub struct Task {
    pub reference: Feature<Shape>,
    pub candidates: Vec<Feature<Shape>>,
}

fn index(features: &[Feature]) -> Result<HashMap<&str, &Feature>, DatasetError> {
    let mut index = HashMap::with_capacity(features.len());
    for feature in features {
        if index.insert(feature.id.as_str(), feature).is_some() {
            return Err(DatasetError::DuplicateFeature(feature.id.clone()));
        }
    }
    Ok(index)
}

impl Dataset {
    /// Resolves every pair into a [`Task`], in pair order.
    ///
    /// Returns [`DatasetError::UnknownFeature`] if a pair refers to an id missing from its feature list and
    /// [`DatasetError::DuplicateFeature`] if an id appears twice in the same list.
    pub fn tasks(&self) -> Result<Vec<Task>, DatasetError> {
        let references = index(&self.references)?;
        let candidates = index(&self.candidates)?;
        let lookup = |index: &HashMap<&str, &Feature>, id: &str| {
            index
                .get(id)
                .map(|feature| (*feature).clone())
                .ok_or_else(|| DatasetError::UnknownFeature(id.to_string()))
        };
        self.pairs
            .iter()
            .map(|pair| {
                Ok(Task {
                    reference: lookup(&references, &pair.reference)?,
                    candidates: pair
                        .candidates
                        .iter()
                        .map(|id| lookup(&candidates, id))
                        .collect::<Result<Vec<_>, _>>()?,
                })
            })
            .collect()
    }
}

/// Loads a JSON dataset file.
pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<Dataset, DatasetError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DatasetError::NotFound(path.to_path_buf()));
    }
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}
