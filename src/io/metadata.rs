//! JSON metadata export for search and contact evaluation results

use crate::config::{ContactParameters, ProjectionParameters, SearchParameters};
use crate::contact::{ContactMetrics, ContactPoint, ContactResults};
use crate::error::{ContactSearchError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete metadata export of one analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMetadata {
    /// Source mesh file
    pub mesh_file: String,

    /// Timestamp when the analysis was performed
    pub timestamp: String,

    /// Search parameters used
    pub search: SearchParameters,

    /// Projection parameters used
    pub projection: ProjectionParameters,

    /// Contact parameters used, absent for a pure search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactParameters>,

    /// Candidate (slave, master) element pairs
    pub candidate_pairs: Vec<CandidatePairMetadata>,

    /// Active contact and coupling points
    #[serde(default)]
    pub contact_points: Vec<ContactPoint>,

    /// Summary statistics, absent for a pure search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ContactMetrics>,
}

/// Metadata for a single candidate pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePairMetadata {
    pub pair_id: usize,
    pub slave_element: usize,
    pub master_element: usize,

    /// Number of active points of the pair, `None` if not evaluated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_contact_points: Option<usize>,
}

impl SearchMetadata {
    /// Create metadata for a search without contact evaluation
    pub fn new(
        mesh_file: String,
        search: &SearchParameters,
        projection: &ProjectionParameters,
        candidate_pairs: &[(usize, usize)],
    ) -> Self {
        let timestamp = chrono::Utc::now().to_rfc3339();

        Self {
            mesh_file,
            timestamp,
            search: search.clone(),
            projection: projection.clone(),
            contact: None,
            candidate_pairs: candidate_pairs
                .iter()
                .enumerate()
                .map(|(pair_id, &(slave, master))| CandidatePairMetadata {
                    pair_id,
                    slave_element: slave,
                    master_element: master,
                    num_contact_points: None,
                })
                .collect(),
            contact_points: Vec::new(),
            metrics: None,
        }
    }

    /// Add the outcome of a contact evaluation
    pub fn add_contact_results(&mut self, contact: &ContactParameters, results: &ContactResults) {
        for pair in &mut self.candidate_pairs {
            let count = results
                .contact_points
                .iter()
                .filter(|p| p.element1 == pair.slave_element && p.element2 == pair.master_element)
                .count();
            pair.num_contact_points = Some(count);
        }
        self.contact = Some(contact.clone());
        self.contact_points = results.contact_points.clone();
        self.metrics = Some(ContactMetrics::compute(
            &results.contact_points,
            contact.penalty_parameter,
        ));
    }

    /// Export metadata to JSON file
    pub fn export<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        serde_json::to_writer_pretty(file, self).map_err(|e| {
            ContactSearchError::ConfigError(format!("Failed to write JSON metadata: {}", e))
        })?;
        Ok(())
    }

    /// Load previously exported metadata
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&content).map_err(|e| {
            ContactSearchError::ConfigError(format!("Failed to parse JSON metadata: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Point;

    fn contact_point(element1: usize, element2: usize, gap: f64) -> ContactPoint {
        ContactPoint {
            element1,
            element2,
            xi1: 0.0,
            xi2: 0.0,
            position1: Point::origin(),
            position2: Point::origin(),
            gap,
            force: 0.0,
            weight: 1.0,
        }
    }

    #[test]
    fn test_search_only_metadata_omits_contact() {
        let metadata = SearchMetadata::new(
            "mesh.json".to_string(),
            &SearchParameters::default(),
            &ProjectionParameters::default(),
            &[(0, 3), (1, 3)],
        );

        let json = serde_json::to_string(&metadata).unwrap();
        assert!(!json.contains("\"metrics\""));
        assert_eq!(metadata.candidate_pairs[1].pair_id, 1);
        assert_eq!(metadata.candidate_pairs[1].slave_element, 1);
    }

    #[test]
    fn test_contact_results_are_counted_per_pair() {
        let mut metadata = SearchMetadata::new(
            "mesh.json".to_string(),
            &SearchParameters::default(),
            &ProjectionParameters::default(),
            &[(0, 3), (1, 3)],
        );
        let results = ContactResults {
            candidate_pairs: vec![(0, 3), (1, 3)],
            num_pairs_evaluated: 2,
            num_active_pairs: 1,
            contact_points: vec![contact_point(1, 3, -0.01), contact_point(1, 3, -0.02)],
        };
        metadata.add_contact_results(&ContactParameters::default(), &results);

        assert_eq!(metadata.candidate_pairs[0].num_contact_points, Some(0));
        assert_eq!(metadata.candidate_pairs[1].num_contact_points, Some(2));
        assert_eq!(metadata.metrics.as_ref().unwrap().min_gap, -0.02);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        metadata.export(&path).unwrap();
        let loaded = SearchMetadata::load(&path).unwrap();
        assert_eq!(loaded.contact_points.len(), 2);
        assert_eq!(loaded.candidate_pairs, metadata.candidate_pairs);
    }
}
