use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ContentId;

/// Folder layout every learning archive starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveStructure {
    pub decisions: String,
    pub monitoring_data: String,
    pub community_stories: String,
    pub lessons_learned: String,
    pub adaptations: String,
    pub final_report: String,
}

impl Default for ArchiveStructure {
    fn default() -> Self {
        Self {
            decisions: "/decisions/".into(),
            monitoring_data: "/monitoring/".into(),
            community_stories: "/stories/".into(),
            lessons_learned: "/lessons/".into(),
            adaptations: "/adaptations/".into(),
            final_report: "/final_report.md".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    pub public_read: bool,
    pub contribute_roles: Vec<String>,
    pub admin_roles: Vec<String>,
}

/// Skeleton of the record where an adoption's trial outcomes accumulate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningArchive {
    pub adoption_id: ContentId,
    pub proposal_id: ContentId,
    pub sense_id: ContentId,
    pub created: DateTime<Utc>,
    pub node_id: String,
    pub structure: ArchiveStructure,
    pub contributors: Vec<String>,
    pub access_control: AccessControl,
    pub protocol_version: String,
}
