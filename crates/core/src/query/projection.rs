//! Field projection from `fields=name,price`.

use crate::error::{CoreError, CoreResult};
use crate::types::{Document, ID_FIELD};

/// Which top-level fields a result keeps. Inclusion always keeps `_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl Projection {
    pub fn apply(&self, mut doc: Document) -> Document {
        match self {
            Projection::Include(fields) => {
                doc.retain(|key, _| key == ID_FIELD || fields.iter().any(|f| f == key));
                doc
            }
            Projection::Exclude(fields) => {
                for field in fields {
                    doc.remove(field);
                }
                doc
            }
        }
    }
}

/// Parse a comma-separated field list.
///
/// Plain names form an inclusion list and `-name` entries an exclusion list;
/// the two modes cannot be mixed. Absent input yields the single
/// `default_exclusion`.
pub fn build_projection(raw: Option<&str>, default_exclusion: &str) -> CoreResult<Projection> {
    let tokens: Vec<&str> = raw
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty() && *t != "-")
                .collect()
        })
        .unwrap_or_default();

    if tokens.is_empty() {
        return Ok(Projection::Exclude(vec![default_exclusion.to_string()]));
    }

    let excluded = tokens.iter().filter(|t| t.starts_with('-')).count();
    if excluded == tokens.len() {
        Ok(Projection::Exclude(
            tokens.iter().map(|t| t[1..].to_string()).collect(),
        ))
    } else if excluded == 0 {
        Ok(Projection::Include(
            tokens.iter().map(|t| t.to_string()).collect(),
        ))
    } else {
        Err(CoreError::Validation(
            "Projection cannot mix included and excluded fields".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn absent_fields_exclude_the_version_field() {
        assert_eq!(
            build_projection(None, "__v").unwrap(),
            Projection::Exclude(vec!["__v".into()])
        );
    }

    #[test]
    fn inclusion_keeps_id() {
        let projection = build_projection(Some("name,price"), "__v").unwrap();
        let doc = json!({ "_id": "1", "name": "Sea", "price": 10, "summary": "x" })
            .as_object()
            .cloned()
            .unwrap();
        let projected = projection.apply(doc);
        assert_eq!(projected.len(), 3);
        assert!(projected.contains_key("_id"));
        assert!(!projected.contains_key("summary"));
    }

    #[test]
    fn mixed_modes_are_rejected() {
        assert_matches!(
            build_projection(Some("name,-price"), "__v"),
            Err(CoreError::Validation(_))
        );
    }
}
