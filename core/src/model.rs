use serde::{Deserialize, Deserializer, Serialize};

use crate::store::{Document, Fields};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(
        rename = "nome",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub email: Option<String>,
    #[serde(
        rename = "telefone",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone: Option<String>,
    #[serde(
        rename = "cidade",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub city: Option<String>,
    #[serde(
        rename = "cargo",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub role: Option<String>,
    #[serde(
        rename = "idade",
        default,
        deserialize_with = "lenient_age",
        skip_serializing_if = "Option::is_none"
    )]
    pub age: Option<u32>,
    #[serde(
        rename = "dataNascimento",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub birth_date: Option<String>,
    #[serde(
        rename = "areaInteresse",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub area_of_interest: Option<String>,
    #[serde(
        rename = "formacao",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub education: Option<String>,
    #[serde(
        rename = "cursos",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub courses: Option<String>,
    #[serde(
        rename = "experiencias",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub experience: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_skills",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub skills: Vec<String>,
    #[serde(rename = "etapa", default, deserialize_with = "lenient_string")]
    pub stage: String,
    #[serde(
        rename = "dataIncricao",
        alias = "dataInscricao",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub submitted_at: Option<String>,
}

impl Candidate {
    /// Builds a record from a store document. The document id always wins over
    /// any `id` key stored in the fields. Mistyped fields decode as empty, so
    /// this only fails when the fields are not an object.
    pub fn from_document(doc: &Document) -> Result<Self, serde_json::Error> {
        let mut candidate: Candidate =
            serde_json::from_value(serde_json::Value::Object(doc.fields.clone()))?;
        candidate.id = doc.id.clone();
        Ok(candidate)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn initial(&self) -> char {
        self.name
            .as_deref()
            .and_then(|name| name.trim().chars().next())
            .map(|ch| ch.to_uppercase().next().unwrap_or(ch))
            .unwrap_or('U')
    }

    /// Document fields for a fresh insert; `id` is assigned by the store.
    pub fn to_fields(&self) -> Fields {
        let mut value = match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => Fields::new(),
        };
        value.remove("id");
        value
    }
}

fn lenient_age<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(number)) => {
            number.as_u64().and_then(|n| u32::try_from(n).ok())
        }
        Some(serde_json::Value::String(text)) => text.trim().parse::<u32>().ok(),
        _ => None,
    })
}

/// Strings pass through, numbers keep their text form, anything else is absent.
fn scalar_text(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(text) => Some(text),
        serde_json::Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(scalar_text))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

/// A list keeps its scalar entries; a lone non-empty string becomes a
/// one-element list.
fn lenient_skills<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Array(items)) => {
            items.into_iter().filter_map(scalar_text).collect()
        }
        Some(serde_json::Value::String(text)) if !text.trim().is_empty() => vec![text],
        _ => Vec::new(),
    })
}

/// Partial update for one candidate. Serializes to only the present keys,
/// using the same document names as [`Candidate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CandidatePatch {
    #[serde(rename = "nome", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "telefone", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "cidade", skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(rename = "cargo", skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(rename = "idade", skip_serializing_if = "Option::is_none")]
    pub age: Option<Option<u32>>,
    #[serde(rename = "dataNascimento", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(rename = "areaInteresse", skip_serializing_if = "Option::is_none")]
    pub area_of_interest: Option<String>,
    #[serde(rename = "formacao", skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
    #[serde(rename = "cursos", skip_serializing_if = "Option::is_none")]
    pub courses: Option<String>,
    #[serde(rename = "experiencias", skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(rename = "etapa", skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
}

impl CandidatePatch {
    pub fn stage(stage_id: impl Into<String>) -> Self {
        Self {
            stage: Some(stage_id.into()),
            ..Self::default()
        }
    }

    /// Whole-record patch carrying every editable field of `candidate`.
    pub fn from_record(candidate: &Candidate) -> Self {
        Self {
            name: Some(candidate.name.clone().unwrap_or_default()),
            email: Some(candidate.email.clone().unwrap_or_default()),
            phone: Some(candidate.phone.clone().unwrap_or_default()),
            city: Some(candidate.city.clone().unwrap_or_default()),
            role: Some(candidate.role.clone().unwrap_or_default()),
            age: Some(candidate.age),
            birth_date: candidate.birth_date.clone(),
            area_of_interest: Some(candidate.area_of_interest.clone().unwrap_or_default()),
            education: Some(candidate.education.clone().unwrap_or_default()),
            courses: Some(candidate.courses.clone().unwrap_or_default()),
            experience: Some(candidate.experience.clone().unwrap_or_default()),
            skills: Some(candidate.skills.clone()),
            stage: Some(candidate.stage.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, candidate: &mut Candidate) {
        fn set(slot: &mut Option<String>, value: &Option<String>) {
            if let Some(value) = value {
                *slot = Some(value.clone());
            }
        }
        set(&mut candidate.name, &self.name);
        set(&mut candidate.email, &self.email);
        set(&mut candidate.phone, &self.phone);
        set(&mut candidate.city, &self.city);
        set(&mut candidate.role, &self.role);
        if let Some(age) = self.age {
            candidate.age = age;
        }
        set(&mut candidate.birth_date, &self.birth_date);
        set(&mut candidate.area_of_interest, &self.area_of_interest);
        set(&mut candidate.education, &self.education);
        set(&mut candidate.courses, &self.courses);
        set(&mut candidate.experience, &self.experience);
        if let Some(skills) = &self.skills {
            candidate.skills = skills.clone();
        }
        if let Some(stage) = &self.stage {
            candidate.stage = stage.clone();
        }
    }

    /// Undoes this patch on `candidate`. Only keys the patch sets are touched,
    /// and only while they still hold the value the patch wrote; anything a
    /// newer snapshot brought in stays.
    pub fn revert(&self, candidate: &mut Candidate, previous: &Candidate) {
        fn undo<T: PartialEq + Clone>(slot: &mut T, written: Option<&T>, before: &T) {
            if written.is_some_and(|written| *slot == *written) {
                *slot = before.clone();
            }
        }
        fn undo_text(slot: &mut Option<String>, written: &Option<String>, before: &Option<String>) {
            if let Some(written) = written {
                if slot.as_deref() == Some(written.as_str()) {
                    *slot = before.clone();
                }
            }
        }
        undo_text(&mut candidate.name, &self.name, &previous.name);
        undo_text(&mut candidate.email, &self.email, &previous.email);
        undo_text(&mut candidate.phone, &self.phone, &previous.phone);
        undo_text(&mut candidate.city, &self.city, &previous.city);
        undo_text(&mut candidate.role, &self.role, &previous.role);
        undo(&mut candidate.age, self.age.as_ref(), &previous.age);
        undo_text(&mut candidate.birth_date, &self.birth_date, &previous.birth_date);
        undo_text(
            &mut candidate.area_of_interest,
            &self.area_of_interest,
            &previous.area_of_interest,
        );
        undo_text(&mut candidate.education, &self.education, &previous.education);
        undo_text(&mut candidate.courses, &self.courses, &previous.courses);
        undo_text(&mut candidate.experience, &self.experience, &previous.experience);
        undo(&mut candidate.skills, self.skills.as_ref(), &previous.skills);
        undo(&mut candidate.stage, self.stage.as_ref(), &previous.stage);
    }

    pub fn to_fields(&self) -> Fields {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => Fields::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: String,
    pub display_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, fields: serde_json::Value) -> Document {
        let serde_json::Value::Object(fields) = fields else {
            panic!("fields must be an object");
        };
        Document {
            id: id.to_string(),
            fields,
        }
    }

    #[test]
    fn from_document_maps_store_keys() {
        let candidate = Candidate::from_document(&doc(
            "abc",
            json!({
                "id": "ignored",
                "nome": "Ana Silva",
                "cidade": "São Paulo",
                "cargo": "Analista de Marketing",
                "etapa": "Inscrito",
                "skills": ["SEO", "Content"],
                "idade": "29",
                "dataIncricao": "2024-05-01T10:00:00Z",
            }),
        ))
        .unwrap();
        assert_eq!(candidate.id, "abc");
        assert_eq!(candidate.name.as_deref(), Some("Ana Silva"));
        assert_eq!(candidate.city.as_deref(), Some("São Paulo"));
        assert_eq!(candidate.age, Some(29));
        assert_eq!(candidate.skills, ["SEO", "Content"]);
        assert_eq!(candidate.submitted_at.as_deref(), Some("2024-05-01T10:00:00Z"));
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let candidate = Candidate::from_document(&doc("x", json!({}))).unwrap();
        assert_eq!(candidate.stage, "");
        assert!(candidate.name.is_none());
        assert!(candidate.skills.is_empty());
        assert_eq!(candidate.initial(), 'U');
    }

    #[test]
    fn age_accepts_number_and_ignores_garbage() {
        let numeric = Candidate::from_document(&doc("x", json!({ "idade": 41 }))).unwrap();
        assert_eq!(numeric.age, Some(41));
        let garbage = Candidate::from_document(&doc("x", json!({ "idade": "abc" }))).unwrap();
        assert_eq!(garbage.age, None);
    }

    #[test]
    fn mistyped_fields_never_fail_the_record() {
        let null_stage =
            Candidate::from_document(&doc("2", json!({ "nome": "Bia", "etapa": null }))).unwrap();
        assert_eq!(null_stage.stage, "");
        assert_eq!(null_stage.name.as_deref(), Some("Bia"));

        let scalar_skills =
            Candidate::from_document(&doc("3", json!({ "skills": "React", "etapa": "Inscrito" })))
                .unwrap();
        assert_eq!(scalar_skills.skills, ["React"]);

        let numeric_name = Candidate::from_document(&doc(
            "4",
            json!({ "nome": 42, "email": false, "skills": ["SQL", null, 7], "id": 9 }),
        ))
        .unwrap();
        assert_eq!(numeric_name.id, "4");
        assert_eq!(numeric_name.name.as_deref(), Some("42"));
        assert!(numeric_name.email.is_none());
        assert_eq!(numeric_name.skills, ["SQL", "7"]);

        let odd_skills = Candidate::from_document(&doc("5", json!({ "skills": { "a": 1 } }))).unwrap();
        assert!(odd_skills.skills.is_empty());
    }

    #[test]
    fn revert_keeps_values_a_newer_snapshot_brought() {
        let previous = Candidate {
            id: "1".into(),
            city: Some("Rio".into()),
            stage: "Inscrito".into(),
            ..Candidate::default()
        };
        let patch = CandidatePatch {
            city: Some("Niterói".into()),
            stage: Some("Considerado".into()),
            ..CandidatePatch::default()
        };
        let mut current = previous.clone();
        patch.apply(&mut current);
        // Another client renamed the city while the write was in flight.
        current.city = Some("Campinas".into());

        patch.revert(&mut current, &previous);
        assert_eq!(current.stage, "Inscrito");
        assert_eq!(current.city.as_deref(), Some("Campinas"));
    }

    #[test]
    fn patch_serializes_only_present_keys() {
        let patch = CandidatePatch::stage("Considerado");
        assert_eq!(
            serde_json::Value::Object(patch.to_fields()),
            json!({ "etapa": "Considerado" })
        );

        let clear_age = CandidatePatch {
            age: Some(None),
            ..CandidatePatch::default()
        };
        assert_eq!(
            serde_json::Value::Object(clear_age.to_fields()),
            json!({ "idade": null })
        );
    }

    #[test]
    fn applying_a_patch_twice_matches_applying_once() {
        let base = Candidate {
            id: "2".into(),
            role: Some("Dev".into()),
            stage: "Inscrito".into(),
            ..Candidate::default()
        };
        let patch = CandidatePatch {
            role: Some("Dev Sr".into()),
            age: Some(Some(30)),
            stage: Some("Entrevista I".into()),
            ..CandidatePatch::default()
        };
        let mut once = base.clone();
        patch.apply(&mut once);
        let mut twice = base;
        patch.apply(&mut twice);
        patch.apply(&mut twice);
        assert_eq!(once, twice);
        assert_eq!(once.role.as_deref(), Some("Dev Sr"));
    }

    #[test]
    fn record_patch_restores_the_record() {
        let source = Candidate {
            id: "1".into(),
            name: Some("Carlos Oliveira".into()),
            age: Some(33),
            skills: vec!["React".into()],
            stage: "Entrevista I".into(),
            ..Candidate::default()
        };
        let mut target = Candidate {
            id: "1".into(),
            stage: "Inscrito".into(),
            ..Candidate::default()
        };
        CandidatePatch::from_record(&source).apply(&mut target);
        assert_eq!(target.name, source.name);
        assert_eq!(target.age, Some(33));
        assert_eq!(target.skills, source.skills);
        assert_eq!(target.stage, "Entrevista I");
    }
}
