//! The enumerated pose instructions.

use crate::config::POSE_INSTRUCTIONS;
use crate::error::{Result, TryOnError};
use std::collections::HashSet;
use std::sync::Arc;

/// Ordered, non-empty list of unique pose instructions.
///
/// Index 0 is the canonical pose: base-model renderings start there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoseCatalog {
    poses: Arc<[String]>,
}

impl PoseCatalog {
    pub fn new<I, S>(poses: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let poses: Vec<String> = poses.into_iter().map(Into::into).collect();
        if poses.is_empty() {
            return Err(TryOnError::validation("poses", "Pose catalog must not be empty"));
        }
        let mut seen = HashSet::new();
        for pose in &poses {
            if pose.trim().is_empty() {
                return Err(TryOnError::validation("poses", "Pose instructions must not be blank"));
            }
            if !seen.insert(pose.as_str()) {
                return Err(TryOnError::validation(
                    "poses",
                    format!("Duplicate pose instruction: {pose}"),
                ));
            }
        }
        Ok(Self {
            poses: poses.into(),
        })
    }

    /// The six reference poses.
    pub fn standard() -> Self {
        Self {
            poses: POSE_INSTRUCTIONS.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.poses.get(index).map(String::as_str)
    }

    pub fn first(&self) -> &str {
        &self.poses[0]
    }

    pub fn index_of(&self, pose: &str) -> Option<usize> {
        self.poses.iter().position(|p| p == pose)
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.poses.iter().map(String::as_str)
    }
}

impl Default for PoseCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog() {
        let poses = PoseCatalog::standard();
        assert_eq!(poses.len(), 6);
        assert_eq!(poses.first(), "Full frontal view, hands on hips");
        assert_eq!(poses.index_of("Side profile view"), Some(2));
        assert_eq!(poses.get(6), None);
    }

    #[test]
    fn test_invalid_catalogs() {
        assert!(PoseCatalog::new(Vec::<String>::new()).is_err());
        assert!(PoseCatalog::new(["a", "a"]).is_err());
        assert!(PoseCatalog::new(["a", " "]).is_err());
        assert_eq!(PoseCatalog::new(["a", "b"]).unwrap().len(), 2);
    }
}
