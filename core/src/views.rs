//! Kanban board and candidate table view models.

use serde::Serialize;

use crate::model::Candidate;
use crate::stage::{Direction, StageModel};

pub const CARD_SKILL_LIMIT: usize = 2;
pub const UNKNOWN_STAGE_ID: &str = "__unknown__";
pub const UNKNOWN_STAGE_LABEL: &str = "Etapa desconhecida";
pub const UNKNOWN_STAGE_COLOR: &str = "bg-red-50 border-red-200";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateCard {
    pub id: String,
    pub name: String,
    pub role: String,
    pub skills: Vec<String>,
    pub city: String,
    pub stage_id: String,
    pub can_advance: bool,
    pub can_retreat: bool,
}

impl CandidateCard {
    fn build(candidate: &Candidate, stages: &StageModel) -> Self {
        Self {
            id: candidate.id.clone(),
            name: candidate.display_name().to_string(),
            role: candidate.role.clone().unwrap_or_default(),
            skills: candidate.skills.iter().take(CARD_SKILL_LIMIT).cloned().collect(),
            city: candidate.city.clone().unwrap_or_default(),
            stage_id: candidate.stage.clone(),
            can_advance: stages.can_advance(&candidate.stage, Direction::Next),
            can_retreat: stages.can_advance(&candidate.stage, Direction::Prev),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KanbanColumn {
    pub stage_id: String,
    pub label: String,
    pub color: String,
    pub count: usize,
    pub cards: Vec<CandidateCard>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KanbanBoard {
    pub columns: Vec<KanbanColumn>,
    /// Candidates whose stage id is not in the pipeline; only present when
    /// at least one exists.
    pub unknown: Option<KanbanColumn>,
}

impl KanbanBoard {
    pub fn build(candidates: &[Candidate], stages: &StageModel) -> Self {
        let mut columns: Vec<KanbanColumn> = stages
            .stages()
            .iter()
            .map(|stage| KanbanColumn {
                stage_id: stage.id.to_string(),
                label: stage.label.to_string(),
                color: stage.color.to_string(),
                count: 0,
                cards: Vec::new(),
            })
            .collect();
        let mut unknown = Vec::new();

        for candidate in candidates {
            let card = CandidateCard::build(candidate, stages);
            match stages.index_of(&candidate.stage) {
                Some(idx) => columns[idx].cards.push(card),
                None => unknown.push(card),
            }
        }
        for column in &mut columns {
            column.count = column.cards.len();
        }

        let unknown = (!unknown.is_empty()).then(|| KanbanColumn {
            stage_id: UNKNOWN_STAGE_ID.to_string(),
            label: UNKNOWN_STAGE_LABEL.to_string(),
            color: UNKNOWN_STAGE_COLOR.to_string(),
            count: unknown.len(),
            cards: unknown,
        });
        Self { columns, unknown }
    }

    pub fn column(&self, stage_id: &str) -> Option<&KanbanColumn> {
        self.columns.iter().find(|column| column.stage_id == stage_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageBadge {
    pub label: String,
    pub color: String,
    pub known: bool,
}

impl StageBadge {
    pub fn for_stage(stage_id: &str, stages: &StageModel) -> Self {
        match stages.get(stage_id) {
            Some(stage) => Self {
                label: stage.label.to_string(),
                color: stage.color.to_string(),
                known: true,
            },
            None => Self {
                label: if stage_id.is_empty() {
                    UNKNOWN_STAGE_LABEL.to_string()
                } else {
                    stage_id.to_string()
                },
                color: UNKNOWN_STAGE_COLOR.to_string(),
                known: false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub badge: StageBadge,
    pub role: String,
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateTable {
    pub rows: Vec<CandidateRow>,
}

impl CandidateTable {
    pub fn build(candidates: &[Candidate], stages: &StageModel) -> Self {
        let rows = candidates
            .iter()
            .map(|candidate| CandidateRow {
                id: candidate.id.clone(),
                name: candidate.display_name().to_string(),
                email: candidate.email.clone().unwrap_or_default(),
                badge: StageBadge::for_stage(&candidate.stage, stages),
                role: candidate.role.clone().unwrap_or_default(),
                city: candidate.city.clone().unwrap_or_default(),
            })
            .collect();
        Self { rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, stage: &str) -> Candidate {
        Candidate {
            id: id.into(),
            name: Some(format!("Candidato {id}")),
            skills: vec!["React".into(), "Node.js".into(), "Firebase".into()],
            stage: stage.into(),
            ..Candidate::default()
        }
    }

    #[test]
    fn board_groups_by_stage_in_pipeline_order() {
        let model = StageModel::default();
        let board = KanbanBoard::build(
            &[
                candidate("1", "Inscrito"),
                candidate("2", "Selecionado"),
                candidate("3", "Inscrito"),
            ],
            &model,
        );
        assert_eq!(board.columns.len(), 6);
        assert_eq!(board.columns[0].count, 2);
        assert_eq!(board.column("Selecionado").unwrap().cards[0].id, "2");
        assert!(board.unknown.is_none());
    }

    #[test]
    fn unknown_stage_lands_in_extra_column() {
        let model = StageModel::default();
        let board = KanbanBoard::build(&[candidate("1", "Contratado")], &model);
        let total: usize = board.columns.iter().map(|c| c.count).sum();
        assert_eq!(total, 0);
        let unknown = board.unknown.unwrap();
        assert_eq!(unknown.label, UNKNOWN_STAGE_LABEL);
        assert_eq!(unknown.cards[0].id, "1");
        assert!(!unknown.cards[0].can_advance);
    }

    #[test]
    fn cards_show_two_skills_and_move_flags() {
        let model = StageModel::default();
        let board = KanbanBoard::build(&[candidate("1", "Inscrito"), candidate("2", "Selecionado")], &model);
        let first = &board.columns[0].cards[0];
        assert_eq!(first.skills, ["React", "Node.js"]);
        assert!(first.can_advance);
        assert!(!first.can_retreat);
        let last = &board.column("Selecionado").unwrap().cards[0];
        assert!(!last.can_advance);
        assert!(last.can_retreat);
    }

    #[test]
    fn table_rows_carry_badges() {
        let model = StageModel::default();
        let table = CandidateTable::build(
            &[candidate("1", "Testes realizados"), candidate("2", "Arquivado")],
            &model,
        );
        assert_eq!(table.rows[0].badge.label, "Testes");
        assert!(table.rows[0].badge.known);
        assert_eq!(table.rows[1].badge.label, "Arquivado");
        assert!(!table.rows[1].badge.known);
    }
}
