//! RON catalog loader

use crate::error::{Error, Result};
use crate::schema::{CatalogFile, GeneratorDef, ItemRecipeDef, LevelTableDef, ToolRecipeDef};
use idlecraft_core::{Catalog, Item, Tool, ToolKey};
use indexmap::IndexMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Accumulates catalog files and produces a validated [`Catalog`]
///
/// Definitions keep their first-seen order. Defining the same item, tool
/// tier, item recipe, tool recipe or level table twice is an error, even
/// across files.
#[derive(Debug, Default)]
pub struct CatalogLoader {
    items: IndexMap<String, Item>,
    tools: IndexMap<ToolKey, Tool>,
    generators: Vec<GeneratorDef>,
    item_recipes: IndexMap<String, ItemRecipeDef>,
    tool_recipes: IndexMap<ToolKey, ToolRecipeDef>,
    levels: IndexMap<String, LevelTableDef>,
}

impl CatalogLoader {
    /// Create a new loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Load one catalog file from a RON string
    pub fn load_str(&mut self, content: &str) -> Result<()> {
        let file: CatalogFile = ron::from_str(content)?;

        for item in file.items {
            if self.items.contains_key(&item.unique_name) {
                return Err(Error::DuplicateDefinition(format!("item '{}'", item.unique_name)));
            }
            self.items.insert(item.unique_name.clone(), item);
        }

        for tool in file.tools {
            let key = tool.key();
            if self.tools.contains_key(&key) {
                return Err(Error::DuplicateDefinition(format!("tool '{}'", key)));
            }
            self.tools.insert(key, tool);
        }

        self.generators.extend(file.generators);

        for recipe in file.item_recipes {
            if recipe.inputs.is_empty() {
                return Err(Error::InvalidSchema(format!(
                    "recipe for '{}' has no inputs",
                    recipe.output
                )));
            }
            if self.item_recipes.contains_key(&recipe.output) {
                return Err(Error::DuplicateDefinition(format!("recipe for '{}'", recipe.output)));
            }
            self.item_recipes.insert(recipe.output.clone(), recipe);
        }

        for recipe in file.tool_recipes {
            let key = recipe.key();
            if recipe.inputs.is_empty() {
                return Err(Error::InvalidSchema(format!(
                    "tool recipe for '{}' has no inputs",
                    key
                )));
            }
            if self.tool_recipes.contains_key(&key) {
                return Err(Error::DuplicateDefinition(format!("tool recipe for '{}'", key)));
            }
            self.tool_recipes.insert(key, recipe);
        }

        for table in file.levels {
            if !table.is_ascending() {
                return Err(Error::InvalidSchema(format!(
                    "level thresholds of '{}' must increase",
                    table.category
                )));
            }
            if self.levels.contains_key(&table.category) {
                return Err(Error::DuplicateDefinition(format!(
                    "levels of '{}'",
                    table.category
                )));
            }
            self.levels.insert(table.category.clone(), table);
        }

        Ok(())
    }

    /// Load a single RON file
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        self.load_str(&content)?;
        debug!(path = %path.display(), "catalog file loaded");
        Ok(())
    }

    /// Load all RON files from a directory, in file name order
    pub fn load_directory(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if !path.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Not a directory: {:?}", path),
            )));
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            entries.push(entry?.path());
        }
        entries.sort();

        for file_path in entries {
            if file_path.extension().map(|e| e == "ron").unwrap_or(false) {
                self.load_file(&file_path)?;
            } else if file_path.is_dir() {
                // Recursively load subdirectories
                self.load_directory(&file_path)?;
            }
        }

        Ok(())
    }

    /// Load a file or, if `path` is a directory, every file beneath it
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.is_dir() {
            self.load_directory(path)
        } else {
            self.load_file(path)
        }
    }

    /// Flatten the definitions and validate the resulting catalog
    pub fn finish(self) -> Result<Catalog> {
        let catalog = Catalog {
            items: self.items.into_values().collect(),
            tools: self.tools.into_values().collect(),
            generatables: self.generators.iter().map(GeneratorDef::to_row).collect(),
            crafting_recipes: self
                .item_recipes
                .values()
                .flat_map(ItemRecipeDef::to_rows)
                .collect(),
            tool_recipes: self
                .tool_recipes
                .values()
                .flat_map(ToolRecipeDef::to_rows)
                .collect(),
            category_levels: self
                .levels
                .values()
                .flat_map(LevelTableDef::to_rows)
                .collect(),
        };
        catalog.validate()?;
        Ok(catalog)
    }
}

/// Load and validate the catalog at `path` (file or directory)
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Catalog> {
    let mut loader = CatalogLoader::new();
    loader.load_path(path)?;
    loader.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use idlecraft_core::{CatalogIndex, Decimal, ErrorKind};

    const MINING: &str = r#"
    (
        items: [
            (unique_name: "stone", name: "Stone", category: "mining", gold_value: 0.5),
            (unique_name: "ore", name: "Ore", category: "mining", probability: 0.4, xp_yield: 3),
        ],
        tools: [
            (unique_name: "pick", name: "Pick", category: "mining", is_repeating: true, storage_capacity: Some(50)),
            (unique_name: "pick", tier: 2, name: "Pick", category: "mining", is_repeating: true, probability_boost: 2.0),
        ],
        generators: [
            (tool: "pick", item: "ore", consumes: Some(("stone", 2))),
        ],
        tool_recipes: [
            (tool: "pick", category: "mining", inputs: {"stone": 5}),
            (tool: "pick", tier: 2, category: "mining", minimum_level: 2, inputs: {"stone": 10, "ore": 4}),
        ],
        levels: [
            (category: "mining", starting_xp: [0, 10, 40]),
        ],
    )
    "#;

    const SMITHING: &str = r#"
    (
        items: [
            (unique_name: "bar", name: "Bar", category: "smithing", is_craftable: true),
        ],
        tools: [
            (unique_name: "anvil", name: "Anvil", category: "smithing", is_multiple_craftable: true, max_crafting_number: Some(3)),
        ],
        item_recipes: [
            (output: "bar", tool: "anvil", duration_secs: 30.0, inputs: {"ore": 2, "stone": 1}),
        ],
    )
    "#;

    #[test]
    fn test_load_and_flatten() {
        let mut loader = CatalogLoader::new();
        loader.load_str(MINING).unwrap();
        loader.load_str(SMITHING).unwrap();
        let catalog = loader.finish().unwrap();

        assert_eq!(catalog.items.len(), 3);
        assert_eq!(catalog.tools.len(), 3);
        assert_eq!(catalog.generatables[0].resource_cost(), Some(("stone", 2)));
        assert_eq!(catalog.crafting_recipes.len(), 2);
        assert_eq!(catalog.tool_recipes.len(), 3);
        assert_eq!(catalog.category_levels.len(), 3);

        let index = CatalogIndex::new(catalog);
        assert_eq!(index.require_item("ore").unwrap().probability, 0.4);
        assert_eq!(index.require_item("stone").unwrap().probability, 1.0);
        assert_eq!(index.require_item("stone").unwrap().gold_value, Decimal::new(5, 1));
        assert_eq!(index.require_item("bar").unwrap().gold_value, Decimal::ZERO);
        assert_eq!(index.recipes_for("bar")[0].output_quantity, 1);
        assert_eq!(index.levels("mining")[2].starting_xp, 40);
        let pick2 = index.tool(&ToolKey::new("pick", 2)).unwrap();
        assert_eq!(pick2.probability_boost, 2.0);
    }

    #[test]
    fn test_duplicates_across_files() {
        let mut loader = CatalogLoader::new();
        loader.load_str(MINING).unwrap();
        let err = loader.load_str(MINING).unwrap_err();
        assert!(matches!(err, Error::DuplicateDefinition(_)));
    }

    #[test]
    fn test_dangling_reference_fails_validation() {
        let mut loader = CatalogLoader::new();
        loader.load_str(SMITHING).unwrap();
        match loader.finish() {
            Err(Error::Catalog(e)) => assert_eq!(e.kind(), ErrorKind::NotFound),
            other => panic!("expected catalog error, got {:?}", other),
        }
    }

    #[test]
    fn test_level_thresholds_must_increase() {
        let mut loader = CatalogLoader::new();
        let err = loader
            .load_str(r#"(levels: [(category: "mining", starting_xp: [0, 10, 10])])"#)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSchema(_)));
    }

    #[test]
    fn test_load_directory_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b_smithing.ron"), SMITHING).unwrap();
        fs::write(dir.path().join("a_mining.ron"), MINING).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let catalog = load_catalog(dir.path()).unwrap();
        let names: Vec<&str> = catalog.items.iter().map(|i| i.unique_name.as_str()).collect();
        assert_eq!(names, vec!["stone", "ore", "bar"]);
    }

    #[test]
    fn test_demo_catalog_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../content/catalog.ron");
        let catalog = load_catalog(path).unwrap();
        let index = CatalogIndex::new(catalog);
        assert!(index.tool(&ToolKey::new("player_ultimate", 1)).is_some());
        assert!(index.item("mining_stone").is_some());
    }
}
