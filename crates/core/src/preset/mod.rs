use std::collections::BTreeMap;

use crate::{config::RendererConfig, Result, VisualiserError};

/// Named groups of renderer configurations.
#[derive(Debug, Clone)]
pub struct PresetLibrary {
    presets: BTreeMap<String, Vec<RendererConfig>>,
}

impl PresetLibrary {
    pub fn new() -> Self {
        Self {
            presets: BTreeMap::new(),
        }
    }

    /// The four styles of the stock demo: `line`, `bars`, `circle` and
    /// `circle_bar`.
    pub fn builtin() -> Self {
        let mut library = Self::new();
        library.register("line", vec![RendererConfig::line()]);
        library.register(
            "bars",
            vec![RendererConfig::bars_bottom(), RendererConfig::bars_top()],
        );
        library.register("circle", vec![RendererConfig::circle()]);
        library.register("circle_bar", vec![RendererConfig::circle_bar()]);
        library
    }

    pub fn register(&mut self, name: impl Into<String>, renderers: Vec<RendererConfig>) {
        self.presets.insert(name.into(), renderers);
    }

    pub fn resolve(&self, name: &str) -> Result<&[RendererConfig]> {
        self.presets
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| VisualiserError::msg(format!("unknown preset `{name}`")))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }
}

impl Default for PresetLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}
