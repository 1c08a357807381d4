//! Candidate detail editor.
//!
//! A draft copy of one candidate is edited through typed field descriptors and
//! only reaches the binding on save.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::binding::{BindingError, CandidateBinding};
use crate::model::{Candidate, CandidatePatch};
use crate::stage::StageModel;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EditorError {
    #[error("no candidate is open in the editor")]
    NotOpen,

    #[error("{label} must be a whole number, got {value:?}")]
    InvalidNumber { label: &'static str, value: String },

    #[error("unknown stage: {0}")]
    UnknownStage(String),

    #[error(transparent)]
    Binding(#[from] BindingError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Personal,
    Professional,
    Pipeline,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Personal, Tab::Professional, Tab::Pipeline];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Personal => "Dados Pessoais",
            Tab::Professional => "Profissional",
            Tab::Pipeline => "Processo Seletivo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
    TextArea,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKey {
    Name,
    Email,
    Phone,
    City,
    Age,
    Role,
    AreaOfInterest,
    Education,
    Courses,
    Experience,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub key: FieldKey,
    pub label: &'static str,
    pub kind: FieldKind,
    pub tab: Tab,
    pub full_width: bool,
}

const fn field(key: FieldKey, label: &'static str, kind: FieldKind, tab: Tab, full_width: bool) -> FieldDescriptor {
    FieldDescriptor {
        key,
        label,
        kind,
        tab,
        full_width,
    }
}

pub const FIELDS: [FieldDescriptor; 10] = [
    field(FieldKey::Name, "Nome Completo", FieldKind::Text, Tab::Personal, true),
    field(FieldKey::Email, "Email", FieldKind::Text, Tab::Personal, false),
    field(FieldKey::Phone, "Telefone", FieldKind::Text, Tab::Personal, false),
    field(FieldKey::City, "Cidade", FieldKind::Text, Tab::Personal, false),
    field(FieldKey::Age, "Idade", FieldKind::Number, Tab::Personal, false),
    field(FieldKey::Role, "Cargo", FieldKind::Text, Tab::Professional, false),
    field(FieldKey::AreaOfInterest, "Área Interesse", FieldKind::Text, Tab::Professional, true),
    field(FieldKey::Education, "Formação", FieldKind::Text, Tab::Professional, false),
    field(FieldKey::Courses, "Cursos", FieldKind::Text, Tab::Professional, true),
    field(FieldKey::Experience, "Experiências", FieldKind::TextArea, Tab::Professional, true),
];

impl FieldKey {
    pub fn descriptor(self) -> &'static FieldDescriptor {
        FIELDS
            .iter()
            .find(|descriptor| descriptor.key == self)
            .unwrap_or(&FIELDS[0])
    }

    pub fn get(self, candidate: &Candidate) -> String {
        let text = match self {
            FieldKey::Name => &candidate.name,
            FieldKey::Email => &candidate.email,
            FieldKey::Phone => &candidate.phone,
            FieldKey::City => &candidate.city,
            FieldKey::Age => return candidate.age.map(|age| age.to_string()).unwrap_or_default(),
            FieldKey::Role => &candidate.role,
            FieldKey::AreaOfInterest => &candidate.area_of_interest,
            FieldKey::Education => &candidate.education,
            FieldKey::Courses => &candidate.courses,
            FieldKey::Experience => &candidate.experience,
        };
        text.clone().unwrap_or_default()
    }

    pub fn set(self, candidate: &mut Candidate, value: &str) -> Result<(), EditorError> {
        let slot = match self {
            FieldKey::Name => &mut candidate.name,
            FieldKey::Email => &mut candidate.email,
            FieldKey::Phone => &mut candidate.phone,
            FieldKey::City => &mut candidate.city,
            FieldKey::Age => {
                let trimmed = value.trim();
                candidate.age = if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.parse::<u32>().map_err(|_| EditorError::InvalidNumber {
                        label: self.descriptor().label,
                        value: value.to_string(),
                    })?)
                };
                return Ok(());
            }
            FieldKey::Role => &mut candidate.role,
            FieldKey::AreaOfInterest => &mut candidate.area_of_interest,
            FieldKey::Education => &mut candidate.education,
            FieldKey::Courses => &mut candidate.courses,
            FieldKey::Experience => &mut candidate.experience,
        };
        *slot = Some(value.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorState {
    Closed,
    Open { draft: Candidate, tab: Tab },
    Editing { draft: Candidate, tab: Tab },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldView {
    pub key: FieldKey,
    pub label: &'static str,
    pub kind: FieldKind,
    pub full_width: bool,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageOption {
    pub id: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabView {
    pub tab: Tab,
    pub label: &'static str,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorView {
    pub candidate_id: String,
    pub initial: char,
    pub title: String,
    pub subtitle: String,
    pub stage: String,
    pub dirty: bool,
    pub tabs: Vec<TabView>,
    pub fields: Vec<FieldView>,
    pub stage_options: Vec<StageOption>,
}

#[derive(Debug)]
pub struct CandidateEditor {
    state: EditorState,
    stages: StageModel,
}

impl CandidateEditor {
    pub fn new(stages: StageModel) -> Self {
        Self {
            state: EditorState::Closed,
            stages,
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, EditorState::Closed)
    }

    pub fn draft(&self) -> Option<&Candidate> {
        match &self.state {
            EditorState::Closed => None,
            EditorState::Open { draft, .. } | EditorState::Editing { draft, .. } => Some(draft),
        }
    }

    pub fn open(&mut self, candidate: Candidate) {
        self.state = EditorState::Open {
            draft: candidate,
            tab: Tab::default(),
        };
    }

    pub fn select_tab(&mut self, tab: Tab) -> Result<(), EditorError> {
        match &mut self.state {
            EditorState::Closed => Err(EditorError::NotOpen),
            EditorState::Open { tab: current, .. } | EditorState::Editing { tab: current, .. } => {
                *current = tab;
                Ok(())
            }
        }
    }

    pub fn set_field(&mut self, key: FieldKey, value: &str) -> Result<(), EditorError> {
        self.edit(|draft| key.set(draft, value))
    }

    /// Jumps the draft to any known stage.
    pub fn set_stage(&mut self, stage_id: &str) -> Result<(), EditorError> {
        let stage = self
            .stages
            .get(stage_id)
            .ok_or_else(|| EditorError::UnknownStage(stage_id.to_string()))?;
        self.edit(|draft| {
            draft.stage = stage.id.to_string();
            Ok(())
        })
    }

    fn edit(&mut self, change: impl FnOnce(&mut Candidate) -> Result<(), EditorError>) -> Result<(), EditorError> {
        let (mut draft, tab, edited) = match std::mem::replace(&mut self.state, EditorState::Closed) {
            EditorState::Closed => return Err(EditorError::NotOpen),
            EditorState::Open { draft, tab } => (draft, tab, false),
            EditorState::Editing { draft, tab } => (draft, tab, true),
        };
        // Setters validate before writing, so a rejected value leaves the draft as it was.
        let result = change(&mut draft);
        self.state = if edited || result.is_ok() {
            EditorState::Editing { draft, tab }
        } else {
            EditorState::Open { draft, tab }
        };
        result
    }

    /// Writes the whole draft through the binding and closes. On failure the
    /// editor stays open with the draft intact.
    pub fn save(&mut self, binding: &CandidateBinding) -> Result<Candidate, EditorError> {
        let draft = self.draft().cloned().ok_or(EditorError::NotOpen)?;
        let saved = binding.update_candidate(&draft.id, CandidatePatch::from_record(&draft))?;
        self.state = EditorState::Closed;
        Ok(saved)
    }

    pub fn cancel(&mut self) {
        self.state = EditorState::Closed;
    }

    pub fn view(&self) -> Option<EditorView> {
        let (draft, tab, dirty) = match &self.state {
            EditorState::Closed => return None,
            EditorState::Open { draft, tab } => (draft, *tab, false),
            EditorState::Editing { draft, tab } => (draft, *tab, true),
        };
        let fields = FIELDS
            .iter()
            .filter(|descriptor| descriptor.tab == tab)
            .map(|descriptor| FieldView {
                key: descriptor.key,
                label: descriptor.label,
                kind: descriptor.kind,
                full_width: descriptor.full_width,
                value: descriptor.key.get(draft),
            })
            .collect();
        let stage_options = if tab == Tab::Pipeline {
            self.stages
                .stages()
                .iter()
                .map(|stage| StageOption {
                    id: stage.id,
                    label: stage.label,
                    selected: stage.id == draft.stage,
                })
                .collect()
        } else {
            Vec::new()
        };
        Some(EditorView {
            candidate_id: draft.id.clone(),
            initial: draft.initial(),
            title: draft.display_name().to_string(),
            subtitle: draft
                .role
                .clone()
                .filter(|role| !role.is_empty())
                .unwrap_or_else(|| "Candidato".to_string()),
            stage: draft.stage.clone(),
            dirty,
            tabs: Tab::ALL
                .iter()
                .map(|t| TabView {
                    tab: *t,
                    label: t.label(),
                    active: *t == tab,
                })
                .collect(),
            fields,
            stage_options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> Candidate {
        Candidate {
            id: "2".into(),
            name: Some("Carlos Oliveira".into()),
            role: Some("Dev".into()),
            age: Some(33),
            stage: "Entrevista I".into(),
            ..Candidate::default()
        }
    }

    #[test]
    fn open_edit_and_cancel_transitions() {
        let mut editor = CandidateEditor::new(StageModel::default());
        assert!(!editor.is_open());
        editor.open(candidate());
        assert!(matches!(editor.state(), EditorState::Open { .. }));
        editor.set_field(FieldKey::City, "Niterói").unwrap();
        assert!(matches!(editor.state(), EditorState::Editing { .. }));
        assert_eq!(editor.draft().unwrap().city.as_deref(), Some("Niterói"));
        editor.cancel();
        assert_eq!(editor.state(), &EditorState::Closed);
    }

    #[test]
    fn closed_editor_rejects_edits() {
        let mut editor = CandidateEditor::new(StageModel::default());
        assert!(matches!(
            editor.set_field(FieldKey::Name, "x"),
            Err(EditorError::NotOpen)
        ));
        assert!(matches!(editor.select_tab(Tab::Pipeline), Err(EditorError::NotOpen)));
        assert!(editor.view().is_none());
    }

    #[test]
    fn number_fields_are_validated() {
        let mut editor = CandidateEditor::new(StageModel::default());
        editor.open(candidate());
        let err = editor.set_field(FieldKey::Age, "trinta").unwrap_err();
        assert!(matches!(err, EditorError::InvalidNumber { label: "Idade", .. }));
        assert_eq!(editor.draft().unwrap().age, Some(33));
        assert!(matches!(editor.state(), EditorState::Open { .. }));

        editor.set_field(FieldKey::Age, " ").unwrap();
        assert_eq!(editor.draft().unwrap().age, None);
        editor.set_field(FieldKey::Age, "34").unwrap();
        assert_eq!(FieldKey::Age.get(editor.draft().unwrap()), "34");
    }

    #[test]
    fn stage_select_jumps_to_any_known_stage() {
        let mut editor = CandidateEditor::new(StageModel::default());
        editor.open(candidate());
        editor.set_stage("Selecionado").unwrap();
        assert_eq!(editor.draft().unwrap().stage, "Selecionado");
        assert!(matches!(
            editor.set_stage("Contratado"),
            Err(EditorError::UnknownStage(_))
        ));
        assert_eq!(editor.draft().unwrap().stage, "Selecionado");
    }

    #[test]
    fn view_lists_fields_of_active_tab() {
        let mut editor = CandidateEditor::new(StageModel::default());
        editor.open(candidate());
        let view = editor.view().unwrap();
        assert_eq!(view.initial, 'C');
        assert_eq!(view.subtitle, "Dev");
        assert!(!view.dirty);
        let labels: Vec<_> = view.fields.iter().map(|f| f.label).collect();
        assert_eq!(labels, ["Nome Completo", "Email", "Telefone", "Cidade", "Idade"]);
        assert!(view.stage_options.is_empty());

        editor.select_tab(Tab::Pipeline).unwrap();
        let view = editor.view().unwrap();
        assert!(view.fields.is_empty());
        assert_eq!(view.stage_options.len(), 6);
        assert!(view.stage_options.iter().any(|o| o.selected && o.id == "Entrevista I"));
        assert!(view.tabs[2].active);
    }

    #[test]
    fn every_field_key_has_one_descriptor() {
        for descriptor in FIELDS {
            assert_eq!(descriptor.key.descriptor(), &descriptor);
        }
    }
}
