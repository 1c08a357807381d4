use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stage {
    pub id: &'static str,
    pub label: &'static str,
    pub color: &'static str,
}

pub const PIPELINE_STAGES: [Stage; 6] = [
    Stage {
        id: "Inscrito",
        label: "Inscrito",
        color: "bg-gray-100 border-gray-300",
    },
    Stage {
        id: "Considerado",
        label: "Considerado",
        color: "bg-blue-50 border-blue-200",
    },
    Stage {
        id: "Entrevista I",
        label: "Entrevista I",
        color: "bg-yellow-50 border-yellow-200",
    },
    Stage {
        id: "Testes realizados",
        label: "Testes",
        color: "bg-purple-50 border-purple-200",
    },
    Stage {
        id: "Entrevista II",
        label: "Entrevista II",
        color: "bg-orange-50 border-orange-200",
    },
    Stage {
        id: "Selecionado",
        label: "Selecionado",
        color: "bg-green-50 border-green-200",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Next,
    Prev,
}

/// The fixed, ordered pipeline. Built once at startup and shared by reference.
#[derive(Debug, Clone, Copy)]
pub struct StageModel {
    stages: &'static [Stage],
}

impl Default for StageModel {
    fn default() -> Self {
        Self::new(&PIPELINE_STAGES)
    }
}

impl StageModel {
    pub const fn new(stages: &'static [Stage]) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &'static [Stage] {
        self.stages
    }

    pub fn first(&self) -> Option<&'static Stage> {
        self.stages.first()
    }

    pub fn index_of(&self, stage_id: &str) -> Option<usize> {
        self.stages.iter().position(|stage| stage.id == stage_id)
    }

    pub fn get(&self, stage_id: &str) -> Option<&'static Stage> {
        self.index_of(stage_id).map(|idx| &self.stages[idx])
    }

    /// Neighbouring stage in `direction`, or `None` when no move happens
    /// (unknown stage id, or already at the boundary).
    pub fn advance(&self, stage_id: &str, direction: Direction) -> Option<&'static Stage> {
        let current = self.index_of(stage_id)?;
        let next = match direction {
            Direction::Next => current.checked_add(1).filter(|idx| *idx < self.stages.len())?,
            Direction::Prev => current.checked_sub(1)?,
        };
        self.stages.get(next)
    }

    pub fn can_advance(&self, stage_id: &str, direction: Direction) -> bool {
        self.advance(stage_id, direction).is_some()
    }
}
