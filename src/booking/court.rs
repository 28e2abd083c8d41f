use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Court {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl Court {
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
        }
    }
}

pub fn find_court<'a>(courts: &'a [Court], court_id: &str) -> Option<&'a Court> {
    courts.iter().find(|court| court.id == court_id)
}
