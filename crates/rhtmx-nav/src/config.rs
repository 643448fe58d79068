// File: src/config.rs
// Purpose: Router options, parsed from the [navigation] section of a TOML file

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Which matched params and data a route passes down to its children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ParamsInheritance {
    /// Only componentless routes pass their params and data down
    #[default]
    ComponentlessOnly,
    /// Every route passes its params and data down
    Always,
}

/// What navigating to the URL that is already active does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OnSameUrlNavigation {
    #[default]
    Ignore,
    /// Run the whole pipeline again (guards, resolvers, stream updates)
    Reload,
}

/// What a navigation to an unparseable URL does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MalformedUrlPolicy {
    /// Report the parse error, then navigate to `/`
    #[default]
    Reset,
    /// Report the parse error and stay where we are
    Error,
}

/// Router behaviour knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterOptions {
    #[serde(default)]
    pub params_inheritance: ParamsInheritance,

    #[serde(default)]
    pub on_same_url_navigation: OnSameUrlNavigation,

    #[serde(default)]
    pub malformed_url: MalformedUrlPolicy,

    /// Bound on load-then-retry passes for lazy routes in one navigation
    #[serde(default = "default_max_lazy_load_passes")]
    pub max_lazy_load_passes: usize,

    /// Bound on guard redirects followed by one navigation call
    #[serde(default = "default_max_guard_redirects")]
    pub max_guard_redirects: usize,

    /// Buffer size of the lifecycle event channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

/// On-disk layout: options live under `[navigation]`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct OptionsFile {
    #[serde(default)]
    navigation: RouterOptions,
}

// Default values
fn default_max_lazy_load_passes() -> usize {
    8
}

fn default_max_guard_redirects() -> usize {
    8
}

fn default_event_capacity() -> usize {
    64
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            params_inheritance: ParamsInheritance::default(),
            on_same_url_navigation: OnSameUrlNavigation::default(),
            malformed_url: MalformedUrlPolicy::default(),
            max_lazy_load_passes: default_max_lazy_load_passes(),
            max_guard_redirects: default_max_guard_redirects(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl RouterOptions {
    /// Load options from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Missing file means defaults
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read router options: {:?}", path))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse router options: {:?}", path))
    }

    /// Parse options from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let file: OptionsFile = toml::from_str(content).context("Invalid [navigation] section")?;
        Ok(file.navigation)
    }

    pub fn with_params_inheritance(mut self, inheritance: ParamsInheritance) -> Self {
        self.params_inheritance = inheritance;
        self
    }

    pub fn with_on_same_url_navigation(mut self, policy: OnSameUrlNavigation) -> Self {
        self.on_same_url_navigation = policy;
        self
    }

    pub fn with_malformed_url(mut self, policy: MalformedUrlPolicy) -> Self {
        self.malformed_url = policy;
        self
    }
}
