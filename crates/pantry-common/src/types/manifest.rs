//! Manifest (`overview.json`) describing produced shards

use super::{Datasource, Language};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default file name of the manifest inside an output directory
pub const MANIFEST_FILE_NAME: &str = "overview.json";

/// One produced shard file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonFile {
    /// File name relative to the output directory
    pub name: String,
    pub source: Datasource,
    /// Lowercase hex SHA-256 of the exact file bytes
    pub sha256: String,
}

/// All shards for one language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagePackage {
    pub language: Language,
    pub files: Vec<JsonFile>,
}

/// Manifest document: a JSON array of [`LanguagePackage`]s.
///
/// Fragments produced by separate runs (usually one per datasource) are
/// folded in with [`Manifest::merge`], which keeps a single entry per
/// language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    packages: Vec<LanguagePackage>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a run's packages into the manifest
    pub fn merge(&mut self, fragment: impl IntoIterator<Item = LanguagePackage>) {
        for package in fragment {
            match self.packages.iter_mut().find(|p| p.language == package.language) {
                Some(existing) => existing.files.extend(package.files),
                None => self.packages.push(package),
            }
        }
        self.packages.sort_by_key(|p| p.language);
    }

    /// Drop every file produced from `source`, and packages left empty
    pub fn remove_source(&mut self, source: Datasource) {
        for package in &mut self.packages {
            package.files.retain(|f| f.source != source);
        }
        self.packages.retain(|p| !p.files.is_empty());
    }

    pub fn packages(&self) -> &[LanguagePackage] {
        &self.packages
    }

    pub fn package(&self, language: Language) -> Option<&LanguagePackage> {
        self.packages.iter().find(|p| p.language == language)
    }

    /// Load a manifest from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&content)?)
    }

    /// Save the manifest as compact JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_vec(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl FromIterator<LanguagePackage> for Manifest {
    fn from_iter<I: IntoIterator<Item = LanguagePackage>>(iter: I) -> Self {
        let mut manifest = Manifest::new();
        manifest.merge(iter);
        manifest
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::checksum::EMPTY_SHA256;

    fn package(language: Language, source: Datasource) -> LanguagePackage {
        LanguagePackage {
            language,
            files: vec![JsonFile {
                name: source.shard_file_name(language),
                source,
                sha256: EMPTY_SHA256.to_string(),
            }],
        }
    }

    #[test]
    fn test_merge_groups_by_language() {
        let mut manifest = Manifest::new();
        manifest.merge(vec![
            package(Language::German, Datasource::NutritionPrivacy),
            package(Language::English, Datasource::NutritionPrivacy),
        ]);
        manifest.merge(vec![
            package(Language::English, Datasource::OpenFoodFacts),
            package(Language::German, Datasource::OpenFoodFacts),
        ]);

        assert_eq!(manifest.packages().len(), 2);
        assert_eq!(manifest.packages()[0].language, Language::English);

        let german = manifest.package(Language::German).unwrap();
        let names: Vec<_> = german.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["np_small_products_de.json", "off_small_products_de.json"]);
    }

    #[test]
    fn test_remove_source() {
        let mut manifest: Manifest = vec![
            package(Language::English, Datasource::OpenFoodFacts),
            package(Language::English, Datasource::NutritionPrivacy),
            package(Language::German, Datasource::OpenFoodFacts),
        ]
        .into_iter()
        .collect();

        manifest.remove_source(Datasource::OpenFoodFacts);

        assert_eq!(manifest.packages().len(), 1);
        let english = manifest.package(Language::English).unwrap();
        assert_eq!(english.files.len(), 1);
        assert_eq!(english.files[0].source, Datasource::NutritionPrivacy);
    }

    #[test]
    fn test_serialized_shape() {
        let manifest: Manifest = vec![package(Language::German, Datasource::OpenFoodFacts)]
            .into_iter()
            .collect();
        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "language": "german",
                "files": [{
                    "name": "off_small_products_de.json",
                    "source": 0,
                    "sha256": EMPTY_SHA256,
                }]
            }])
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE_NAME);
        let manifest: Manifest = vec![package(Language::English, Datasource::OpenFoodFacts)]
            .into_iter()
            .collect();

        manifest.save(&path).unwrap();
        assert_eq!(Manifest::load(&path).unwrap(), manifest);
    }
}
