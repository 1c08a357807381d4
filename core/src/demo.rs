//! Sample candidates for an empty collection.

use std::sync::{Arc, Mutex};

use tracing::info;

use crate::crypto::now_string;
use crate::lock;
use crate::model::Candidate;
use crate::store::{CollectionPath, Document, DocumentStore, SnapshotObserver, StoreError};

#[allow(clippy::too_many_arguments)]
fn sample(
    name: &str,
    email: &str,
    phone: &str,
    city: &str,
    role: &str,
    stage: &str,
    birth_date: &str,
    area: &str,
    skills: &[&str],
) -> Candidate {
    Candidate {
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        phone: Some(phone.to_string()),
        city: Some(city.to_string()),
        role: Some(role.to_string()),
        stage: stage.to_string(),
        birth_date: Some(birth_date.to_string()),
        area_of_interest: Some(area.to_string()),
        skills: skills.iter().map(|s| s.to_string()).collect(),
        submitted_at: Some(now_string()),
        ..Candidate::default()
    }
}

pub fn demo_candidates() -> Vec<Candidate> {
    vec![
        sample(
            "Ana Silva",
            "ana.silva@email.com",
            "(11) 99999-9999",
            "São Paulo",
            "Analista de Marketing",
            "Inscrito",
            "1995-05-20",
            "Marketing",
            &["SEO", "Content", "Social Media"],
        ),
        sample(
            "Carlos Oliveira",
            "carlos.dev@email.com",
            "(21) 98888-8888",
            "Rio de Janeiro",
            "Desenvolvedor Full Stack",
            "Entrevista I",
            "1990-10-15",
            "Tecnologia",
            &["React", "Node.js", "Firebase"],
        ),
        sample(
            "Mariana Costa",
            "mari.rh@email.com",
            "(31) 97777-7777",
            "Belo Horizonte",
            "Recrutadora",
            "Selecionado",
            "1988-03-30",
            "Recursos Humanos",
            &["Gestão de Pessoas", "Psicologia"],
        ),
    ]
}

struct CountObserver(Mutex<Option<Result<usize, String>>>);

impl SnapshotObserver for CountObserver {
    fn on_next(&self, documents: Vec<Document>) {
        *lock(&self.0) = Some(Ok(documents.len()));
    }

    fn on_error(&self, error: StoreError) {
        *lock(&self.0) = Some(Err(error.to_string()));
    }
}

/// Inserts [`demo_candidates`] when the collection is empty. Returns how many
/// were inserted.
pub fn seed_if_empty(store: &dyn DocumentStore, path: &CollectionPath) -> Result<usize, StoreError> {
    let observer = Arc::new(CountObserver(Mutex::new(None)));
    let mut query = store.subscribe(path, observer.clone())?;
    query.cancel();
    let count = lock(&observer.0).take();
    match count {
        Some(Ok(0)) => {}
        Some(Ok(_)) => return Ok(0),
        Some(Err(message)) => return Err(StoreError::Unavailable(message)),
        None => return Err(StoreError::Unavailable("no snapshot delivered".to_string())),
    }

    let candidates = demo_candidates();
    for candidate in &candidates {
        store.insert(path, candidate.to_fields())?;
    }
    info!(collection = %path, count = candidates.len(), "demo candidates seeded");
    Ok(candidates.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalDocumentStore;

    #[test]
    fn seeds_only_an_empty_collection() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDocumentStore::open(dir.path(), None);
        let path = CollectionPath::candidates("demo");
        assert_eq!(seed_if_empty(&store, &path).unwrap(), 3);
        assert_eq!(seed_if_empty(&store, &path).unwrap(), 0);

        let docs = store.documents(&path).unwrap();
        assert_eq!(docs.len(), 3);
        let first = Candidate::from_document(&docs[0]).unwrap();
        assert_eq!(first.name.as_deref(), Some("Ana Silva"));
        assert_eq!(first.stage, "Inscrito");
        assert!(first.submitted_at.is_some());
    }
}
