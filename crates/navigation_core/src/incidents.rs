use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use shared::domain::{Incident, IncidentId, IncidentKind};
use tracing::info;

/// Append-only record of user-submitted incident reports. Ids are assigned
/// in submission order starting at 1.
#[derive(Default)]
pub struct IncidentLog {
    entries: RwLock<Vec<Incident>>,
}

impl IncidentLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(
        &self,
        kind: IncidentKind,
        location: impl Into<String>,
        description: Option<String>,
    ) -> Incident {
        let description = description
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let incident = Incident {
            id: IncidentId(entries.len() as i64 + 1),
            kind,
            location: location.into(),
            description,
            reported_at: Utc::now(),
        };
        entries.push(incident.clone());

        info!(
            incident_id = incident.id.0,
            kind = %incident.kind,
            location = %incident.location,
            "incidents: report recorded"
        );
        incident
    }

    pub fn list(&self) -> Vec<Incident> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
