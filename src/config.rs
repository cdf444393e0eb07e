//! Configuration for search, projection and contact evaluation
//!
//! All parameter sets are plain serde structs with defaults so that JSON
//! configuration files only need to name the values they change.

use crate::error::{ContactSearchError, Result};
use crate::search::bounding_volume::DopKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Diagnostic output volume of the numerical kernels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Quiet,
    #[default]
    Standard,
    Debug,
}

/// Strategy for refreshing tree volumes after nodal motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TreeUpdateType {
    /// Recompute every node from its element geometry
    #[default]
    TopDown,
    /// Recompute leaves, then merge upwards layer by layer
    BottomUp,
}

impl std::str::FromStr for TreeUpdateType {
    type Err = ContactSearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "top_down" | "topdown" => Ok(TreeUpdateType::TopDown),
            "bottom_up" | "bottomup" => Ok(TreeUpdateType::BottomUp),
            other => Err(ContactSearchError::ConfigError(format!(
                "Unknown tree update type '{}'. Expected 'top-down' or 'bottom-up'",
                other
            ))),
        }
    }
}

/// Binary tree search parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParameters {
    /// Enlargement factor relative to the smallest element length
    pub eps: f64,

    pub update_type: TreeUpdateType,

    /// Direction set of the node volumes
    pub dop: DopKind,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            eps: 0.1,
            update_type: TreeUpdateType::TopDown,
            dop: DopKind::Dop18,
        }
    }
}

/// Newton point-to-curve projection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionParameters {
    pub max_iterations: usize,

    /// Tolerance on the length-scaled orthogonality residual
    pub tolerance_residual: f64,

    /// Tolerance on the parameter increment
    pub tolerance_increment: f64,

    /// Distance below which slave point and curve point are considered identical
    pub identical_points_tolerance: f64,

    /// Threshold on the residual linearization below which the projection is not unique
    pub nonunique_tolerance: f64,

    pub verbosity: Verbosity,
}

impl Default for ProjectionParameters {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tolerance_residual: 1.0e-10,
            tolerance_increment: 1.0e-10,
            identical_points_tolerance: 1.0e-12,
            nonunique_tolerance: 1.0e-12,
            verbosity: Verbosity::Standard,
        }
    }
}

/// Penalty contact parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactParameters {
    pub penalty_parameter: f64,

    /// Gauss points per slave element
    pub num_gauss_points: usize,
}

impl Default for ContactParameters {
    fn default() -> Self {
        Self {
            penalty_parameter: 1.0e3,
            num_gauss_points: 5,
        }
    }
}

/// A prescribed coupling point between two beam elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCouplingConfig {
    pub element1: usize,
    pub xi1: f64,
    pub element2: usize,
    pub xi2: f64,
}

/// Top-level configuration for a contact analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Input mesh file path (JSON)
    pub mesh_file: String,

    /// Output directory for results
    pub output_dir: String,

    /// Slave element ids
    pub slave_elements: Vec<usize>,

    /// Master element ids
    pub master_elements: Vec<usize>,

    #[serde(default)]
    pub search: SearchParameters,

    #[serde(default)]
    pub projection: ProjectionParameters,

    #[serde(default)]
    pub contact: ContactParameters,

    /// Penalty point couplings evaluated in addition to line contact
    #[serde(default)]
    pub point_couplings: Vec<PointCouplingConfig>,
}

impl AnalysisConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ContactSearchError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|e| {
            ContactSearchError::ConfigError(format!("Failed to parse config file: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            ContactSearchError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, content).map_err(|e| {
            ContactSearchError::ConfigError(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Build a configuration from command-line element lists
    /// Format: "0-9,12,15-17"
    pub fn from_element_ranges(
        mesh_file: String,
        output_dir: String,
        slave: &str,
        master: &str,
        search: SearchParameters,
    ) -> Result<Self> {
        let config = AnalysisConfig {
            mesh_file,
            output_dir,
            slave_elements: parse_element_list(slave)?,
            master_elements: parse_element_list(master)?,
            search,
            projection: ProjectionParameters::default(),
            contact: ContactParameters::default(),
            point_couplings: Vec::new(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.search.eps < 0.0 || !self.search.eps.is_finite() {
            return Err(ContactSearchError::ConfigError(format!(
                "Enlargement factor must be a finite value >= 0, got {}",
                self.search.eps
            )));
        }
        if self.projection.max_iterations == 0 {
            return Err(ContactSearchError::ConfigError(
                "Maximum number of Newton iterations must be positive".to_string(),
            ));
        }
        if self.contact.penalty_parameter < 0.0 {
            return Err(ContactSearchError::ConfigError(format!(
                "Penalty parameter must be >= 0, got {}",
                self.contact.penalty_parameter
            )));
        }
        if let Some(dup) = self
            .slave_elements
            .iter()
            .find(|id| self.master_elements.contains(id))
        {
            return Err(ContactSearchError::ConfigError(format!(
                "Element {} is listed as both slave and master",
                dup
            )));
        }
        Ok(())
    }
}

/// Parse an element id list like "0-9,12"
pub fn parse_element_list(list: &str) -> Result<Vec<usize>> {
    let parse = |s: &str| {
        s.trim().parse::<usize>().map_err(|e| {
            ContactSearchError::ConfigError(format!("Invalid element id '{}': {}", s.trim(), e))
        })
    };

    let mut ids = Vec::new();
    for item in list.split(',').filter(|s| !s.trim().is_empty()) {
        match item.split_once('-') {
            Some((first, last)) => {
                let (first, last) = (parse(first)?, parse(last)?);
                if first > last {
                    return Err(ContactSearchError::ConfigError(format!(
                        "Invalid element range '{}'",
                        item.trim()
                    )));
                }
                ids.extend(first..=last);
            }
            None => ids.push(parse(item)?),
        }
    }
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_element_list() {
        assert_eq!(parse_element_list("0-3, 7,5").unwrap(), vec![0, 1, 2, 3, 5, 7]);
        assert_eq!(parse_element_list("").unwrap(), Vec::<usize>::new());
        assert!(parse_element_list("4-2").is_err());
        assert!(parse_element_list("a").is_err());
    }

    #[test]
    fn test_from_element_ranges() {
        let config = AnalysisConfig::from_element_ranges(
            "mesh.json".to_string(),
            "output".to_string(),
            "0-4",
            "5-9",
            SearchParameters::default(),
        )
        .unwrap();

        assert_eq!(config.slave_elements.len(), 5);
        assert_eq!(config.master_elements, vec![5, 6, 7, 8, 9]);
        assert_eq!(config.projection.max_iterations, 10);
    }

    #[test]
    fn test_overlapping_sets_rejected() {
        let result = AnalysisConfig::from_element_ranges(
            "mesh.json".to_string(),
            "output".to_string(),
            "0-4",
            "4-9",
            SearchParameters::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "mesh_file": "beams.json",
            "output_dir": "out",
            "slave_elements": [0],
            "master_elements": [1],
            "search": { "eps": 0.5, "update_type": "bottom_up" },
            "projection": { "verbosity": "debug" }
        }"#;
        let config: AnalysisConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.search.eps, 0.5);
        assert_eq!(config.search.update_type, TreeUpdateType::BottomUp);
        assert_eq!(config.search.dop, DopKind::Dop18);
        assert_eq!(config.projection.verbosity, Verbosity::Debug);
        assert_eq!(config.projection.tolerance_residual, 1.0e-10);
        assert_eq!(config.contact.num_gauss_points, 5);
        assert!(config.point_couplings.is_empty());
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = AnalysisConfig::from_element_ranges(
            "mesh.json".to_string(),
            "output".to_string(),
            "0",
            "1",
            SearchParameters::default(),
        )
        .unwrap();
        config.to_file(&path).unwrap();
        assert_eq!(AnalysisConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_update_type_from_str() {
        assert_eq!("bottom-up".parse::<TreeUpdateType>().unwrap(), TreeUpdateType::BottomUp);
        assert_eq!("TopDown".parse::<TreeUpdateType>().unwrap(), TreeUpdateType::TopDown);
        assert!("sideways".parse::<TreeUpdateType>().is_err());
    }
}
