//! Plugin Manager
//!
//! Finds installed tool binaries under a bin root and maps each registered
//! capability to the executables that match its discovery patterns.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use log::{debug, info, warn};
use walkdir::WalkDir;
use crate::plugin::registry::PluginRegistry;
use crate::plugin::traits::ToolPlugin;

/// Installed-tool discovery over a bin directory
#[derive(Debug, Default)]
pub struct PluginManager {
    bin_root: Option<PathBuf>,
    installed: HashMap<String, Vec<PathBuf>>,
}

impl PluginManager {
    pub fn new(bin_root: Option<PathBuf>) -> Self {
        Self {
            bin_root,
            installed: HashMap::new(),
        }
    }

    pub fn bin_root(&self) -> Option<&Path> {
        self.bin_root.as_deref()
    }

    /// Rescan the bin root for every registered plugin.
    ///
    /// A missing or unset bin root logs a warning and leaves the map empty.
    pub fn scan_installed(&mut self, registry: &PluginRegistry) -> &HashMap<String, Vec<PathBuf>> {
        self.installed.clear();

        let root = match &self.bin_root {
            Some(root) if root.is_dir() => root.clone(),
            Some(root) => {
                warn!("Bin directory does not exist: {}", root.display());
                return &self.installed;
            }
            None => {
                debug!("No bin directory configured, skipping tool scan");
                return &self.installed;
            }
        };

        let wanted: Vec<(Arc<dyn ToolPlugin>, HashSet<String>)> = registry.list()
            .into_iter()
            .map(|plugin| {
                let patterns = plugin.executable_patterns()
                    .iter()
                    .map(|pattern| pattern.to_lowercase())
                    .collect();
                (plugin, patterns)
            })
            .collect();

        let walker = WalkDir::new(&root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Skipping unreadable entry under {}: {}", root.display(), e);
                    None
                }
            });

        for entry in walker.filter(|e| e.file_type().is_file()) {
            let file_name = entry.file_name().to_string_lossy().to_lowercase();
            for (plugin, patterns) in &wanted {
                if patterns.contains(&file_name) {
                    let paths = self.installed.entry(plugin.name().to_string()).or_default();
                    let path = entry.path().to_path_buf();
                    if !paths.contains(&path) {
                        paths.push(path);
                    }
                }
            }
        }

        // Installations under a plugin's own search paths come first
        for (plugin, _) in &wanted {
            let search_paths = normalized_search_paths(plugin.as_ref());
            if let Some(paths) = self.installed.get_mut(plugin.name()) {
                paths.sort_by_key(|path| search_rank(&root, path, &search_paths));
                info!("Found {} installation(s) of {}", paths.len(), plugin.display_name());
            }
        }

        &self.installed
    }

    /// Path of the `index`-th installation found for a plugin
    pub fn get_installed_path(&self, name: &str, index: usize) -> Option<&Path> {
        self.installed
            .get(name)
            .and_then(|paths| paths.get(index))
            .map(PathBuf::as_path)
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.installed.get(name).map(|paths| !paths.is_empty()).unwrap_or(false)
    }

    pub fn installed(&self) -> &HashMap<String, Vec<PathBuf>> {
        &self.installed
    }

    /// First plugin whose patterns match the file name of `executable`
    pub fn plugin_for_executable(&self, registry: &PluginRegistry, executable: &Path) -> Option<Arc<dyn ToolPlugin>> {
        let name = executable.file_name()?.to_string_lossy();
        registry.find_by_executable(&name).into_iter().next()
    }
}

fn normalized_search_paths(plugin: &dyn ToolPlugin) -> Vec<String> {
    plugin.search_paths()
        .iter()
        .map(|dir| dir.replace('\\', "/").trim_matches('/').to_lowercase())
        .collect()
}

/// Index of the search path that directly holds `path`, or past the end
fn search_rank(root: &Path, path: &Path, search_paths: &[String]) -> usize {
    let parent = path.parent()
        .and_then(|dir| dir.strip_prefix(root).ok())
        .map(|dir| dir.components()
            .map(|part| part.as_os_str().to_string_lossy().to_lowercase())
            .collect::<Vec<_>>()
            .join("/"));
    parent
        .and_then(|dir| search_paths.iter().position(|candidate| *candidate == dir))
        .unwrap_or(search_paths.len())
}
