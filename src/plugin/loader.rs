//! Plugin Loader
//!
//! Hot add/remove/reload of descriptor-defined capabilities. Every load
//! builds a new instance through the descriptor's entry point and registers
//! it under a fresh synthetic module name, so a reload never hands back the
//! instance it replaced.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use log::{debug, info, warn};
use walkdir::WalkDir;
use crate::plugin::descriptor::PluginDescriptor;
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::registry::PluginRegistry;

/// Book-keeping for one loaded descriptor
#[derive(Debug, Clone)]
pub struct LoadedModule {
    /// Synthetic unique module name, `<stem>#<generation>`
    pub module_name: String,
    pub plugin_name: String,
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
}

/// Outcome of a directory scan or bulk reload
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub errors: Vec<(PathBuf, PluginError)>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct PluginLoader {
    modules: HashMap<String, LoadedModule>,
    generation: u64,
}

impl PluginLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load one descriptor file and register the capability it constructs
    pub fn load_from_file(&mut self, registry: &mut PluginRegistry, path: &Path) -> PluginResult<String> {
        let descriptor = PluginDescriptor::from_file(path)?;
        let plugin = descriptor.instantiate(path)?;
        let plugin_name = plugin.name().to_string();

        if let Some(previous) = self.modules.get(&plugin_name) {
            if previous.path != path {
                warn!(
                    "Plugin '{}' from {} replaces the one loaded from {}",
                    plugin_name,
                    path.display(),
                    previous.path.display()
                );
            }
        }

        self.generation += 1;
        let stem = path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "plugin".to_string());
        let module = LoadedModule {
            module_name: format!("{}#{}", stem, self.generation),
            plugin_name: plugin_name.clone(),
            path: path.to_path_buf(),
            modified: modified_time(path),
        };

        debug!("Loaded module {} as plugin '{}'", module.module_name, plugin_name);
        registry.register(plugin);
        self.modules.insert(plugin_name.clone(), module);
        Ok(plugin_name)
    }

    /// Load every descriptor in a directory. Per-file failures are collected,
    /// never abort the scan. Files whose name starts with `_` are skipped.
    pub fn load_from_directory(&mut self, registry: &mut PluginRegistry, dir: &Path) -> LoadReport {
        let mut report = LoadReport::default();

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot read plugin directory {}: {}", dir.display(), e);
                report.errors.push((
                    dir.to_path_buf(),
                    PluginError::discovery_error(format!("Failed to read directory {}: {}", dir.display(), e)),
                ));
                return report;
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_descriptor_file(path))
            .collect();
        paths.sort();

        self.load_paths(registry, dir, paths, report)
    }

    /// Like [`load_from_directory`](Self::load_from_directory) but descends
    /// into subdirectories. Directories whose name starts with `_` are
    /// skipped along with everything below them.
    pub fn load_from_directory_recursive(&mut self, registry: &mut PluginRegistry, dir: &Path) -> LoadReport {
        let mut report = LoadReport::default();
        let mut paths = Vec::new();

        let walker = WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.path()));

        for entry in walker {
            match entry {
                Ok(entry) if is_descriptor_file(entry.path()) => paths.push(entry.into_path()),
                Ok(_) => {}
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
                    warn!("Cannot read plugin directory {}: {}", path.display(), e);
                    report.errors.push((
                        path.clone(),
                        PluginError::discovery_error(format!("Failed to read directory {}: {}", path.display(), e)),
                    ));
                }
            }
        }

        self.load_paths(registry, dir, paths, report)
    }

    fn load_paths(
        &mut self,
        registry: &mut PluginRegistry,
        dir: &Path,
        paths: Vec<PathBuf>,
        mut report: LoadReport,
    ) -> LoadReport {
        for path in paths {
            match self.load_from_file(registry, &path) {
                Ok(name) => report.loaded.push(name),
                Err(e) => {
                    warn!("Failed to load plugin {}: {}", path.display(), e);
                    report.errors.push((path, e));
                }
            }
        }

        info!("Loaded {} plugin module(s) from {}", report.loaded.len(), dir.display());
        report
    }

    /// Deregister a loaded plugin and drop its module record
    pub fn unload(&mut self, registry: &mut PluginRegistry, name: &str) -> bool {
        match self.modules.remove(name) {
            Some(module) => {
                registry.unregister(name);
                debug!("Unloaded module {}", module.module_name);
                true
            }
            None => false,
        }
    }

    /// Unload then load again from the same file
    pub fn reload(&mut self, registry: &mut PluginRegistry, name: &str) -> PluginResult<String> {
        let path = self.modules
            .get(name)
            .map(|module| module.path.clone())
            .ok_or_else(|| PluginError::plugin_not_found(name))?;

        self.unload(registry, name);
        self.load_from_file(registry, &path)
    }

    /// Names of loaded plugins whose file changed or disappeared
    pub fn check_for_changes(&self) -> Vec<String> {
        let mut changed: Vec<String> = self.modules
            .values()
            .filter(|module| modified_time(&module.path) != module.modified || !module.path.exists())
            .map(|module| module.plugin_name.clone())
            .collect();
        changed.sort();
        changed
    }

    /// Reload every changed plugin. A deleted file leaves its plugin unloaded.
    pub fn auto_reload_changed(&mut self, registry: &mut PluginRegistry) -> LoadReport {
        let mut report = LoadReport::default();

        for name in self.check_for_changes() {
            let path = match self.modules.get(&name) {
                Some(module) => module.path.clone(),
                None => continue,
            };
            match self.reload(registry, &name) {
                Ok(reloaded) => {
                    info!("Reloaded plugin '{}'", reloaded);
                    report.loaded.push(reloaded);
                }
                Err(e) => {
                    warn!("Failed to reload plugin '{}': {}", name, e);
                    report.errors.push((path, e));
                }
            }
        }

        report
    }

    pub fn module(&self, name: &str) -> Option<&LoadedModule> {
        self.modules.get(name)
    }

    pub fn loaded_plugins(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.keys().cloned().collect();
        names.sort();
        names
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('_'))
        .unwrap_or(true)
}

fn is_descriptor_file(path: &Path) -> bool {
    let hidden = is_hidden(path);
    let yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );
    path.is_file() && yaml && !hidden
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}
