use serde::{Deserialize, Serialize};

/// One learner row from the batch spreadsheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnerRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub session_ref: String,
    pub evaluation_date: String,
}

impl LearnerRecord {
    /// Identity string used in diagnostics
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Deterministic, filesystem-safe stem for the rendered document.
    ///
    /// Every non-alphanumeric character of the identity fields is replaced
    /// by `_`.
    pub fn document_stem(&self) -> String {
        let raw = format!("QCM_{}_{}", self.first_name, self.last_name);
        raw.chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn learner(first: &str, last: &str) -> LearnerRecord {
        LearnerRecord {
            first_name: first.to_string(),
            last_name: last.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_document_stem_sanitizes() {
        let l = learner("Jean-Luc", "O'Neil / Dupont");
        assert_eq!(l.document_stem(), "QCM_Jean_Luc_O_Neil___Dupont");
    }

    #[test]
    fn test_document_stem_keeps_accents() {
        // Accented letters are alphanumeric and stay put
        let l = learner("Léa", "Müller");
        assert_eq!(l.document_stem(), "QCM_Léa_Müller");
    }
}
