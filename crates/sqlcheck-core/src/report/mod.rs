use crate::model::ScenarioResult;
use serde::Serialize;

pub mod console;
pub mod json;
pub mod junit;

#[derive(Debug, Clone, Serialize)]
pub struct RunArtifacts {
    pub run_id: i64,
    pub suite: String,
    pub snapshot: String,
    pub results: Vec<ScenarioResult>,
}

impl RunArtifacts {
    pub fn any_failure(&self) -> bool {
        self.results.iter().any(|r| r.is_failure())
    }
}
