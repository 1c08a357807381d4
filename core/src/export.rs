use crate::model::Candidate;
use crate::stage::StageModel;

pub const EXPORT_COLUMNS: [&str; 7] = ["Nome", "Email", "Telefone", "Cidade", "Cargo", "Etapa", "Skills"];

fn should_neutralize_csv(value: &str) -> bool {
    let trimmed = value.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('\'') {
        return false;
    }
    matches!(trimmed.chars().next(), Some('=' | '+' | '-' | '@'))
}

fn neutralize_csv_formula(value: &str) -> String {
    if should_neutralize_csv(value) {
        format!("'{value}")
    } else {
        value.to_string()
    }
}

fn csv_escape(value: &str) -> String {
    let safe = neutralize_csv_formula(value);
    if safe.contains(',') || safe.contains('"') || safe.contains('\n') || safe.contains('\r') {
        format!("\"{}\"", safe.replace('"', "\"\""))
    } else {
        safe
    }
}

pub fn candidates_to_csv(candidates: &[Candidate], stages: &StageModel) -> String {
    let mut lines = Vec::with_capacity(candidates.len() + 1);
    lines.push(EXPORT_COLUMNS.map(csv_escape).join(","));
    for candidate in candidates {
        let stage = stages
            .get(&candidate.stage)
            .map(|stage| stage.label.to_string())
            .unwrap_or_else(|| candidate.stage.clone());
        let cells = [
            candidate.display_name().to_string(),
            candidate.email.clone().unwrap_or_default(),
            candidate.phone.clone().unwrap_or_default(),
            candidate.city.clone().unwrap_or_default(),
            candidate.role.clone().unwrap_or_default(),
            stage,
            candidate.skills.join("; "),
        ];
        lines.push(
            cells
                .iter()
                .map(|cell| csv_escape(cell))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    lines.join("\n")
}

pub fn sanitize_filename(value: &str) -> String {
    let out: String = value
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = out.trim_matches('_');
    let safe = if trimmed.is_empty() {
        "candidatos".to_string()
    } else {
        trimmed.to_string()
    };
    if safe.to_lowercase().ends_with(".csv") {
        safe
    } else {
        format!("{safe}.csv")
    }
}
