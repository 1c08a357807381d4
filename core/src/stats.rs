use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::Candidate;
use crate::stage::StageModel;

/// Count per known stage id; every stage is present, zero when empty.
pub fn counts_by_stage(candidates: &[Candidate], stages: &StageModel) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = stages
        .stages()
        .iter()
        .map(|stage| (stage.id.to_string(), 0))
        .collect();
    for candidate in candidates {
        if let Some(count) = counts.get_mut(candidate.stage.as_str()) {
            *count += 1;
        }
    }
    counts
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageCount {
    pub stage_id: &'static str,
    pub label: &'static str,
    pub color: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsStrip {
    pub stages: Vec<StageCount>,
    pub unknown: usize,
    pub total: usize,
}

impl StatsStrip {
    pub fn build(candidates: &[Candidate], stages: &StageModel) -> Self {
        let counts = counts_by_stage(candidates, stages);
        let strip: Vec<StageCount> = stages
            .stages()
            .iter()
            .map(|stage| StageCount {
                stage_id: stage.id,
                label: stage.label,
                color: stage.color,
                count: counts.get(stage.id).copied().unwrap_or(0),
            })
            .collect();
        let known: usize = strip.iter().map(|entry| entry.count).sum();
        Self {
            stages: strip,
            unknown: candidates.len() - known,
            total: candidates.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(stage: &str) -> Candidate {
        Candidate {
            id: stage.into(),
            stage: stage.into(),
            ..Candidate::default()
        }
    }

    #[test]
    fn counts_include_every_stage() {
        let model = StageModel::default();
        let counts = counts_by_stage(&[at("Inscrito"), at("Inscrito"), at("Selecionado")], &model);
        assert_eq!(counts.len(), 6);
        assert_eq!(counts["Inscrito"], 2);
        assert_eq!(counts["Selecionado"], 1);
        assert_eq!(counts["Entrevista II"], 0);
    }

    #[test]
    fn strip_keeps_pipeline_order_and_counts_unknown() {
        let model = StageModel::default();
        let strip = StatsStrip::build(&[at("Considerado"), at("Arquivado")], &model);
        assert_eq!(strip.stages[0].stage_id, "Inscrito");
        assert_eq!(strip.stages[1].count, 1);
        assert_eq!(strip.stages[3].label, "Testes");
        assert_eq!(strip.unknown, 1);
        assert_eq!(strip.total, 2);
    }
}
