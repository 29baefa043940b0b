//! Tri-state patch fields.
//!
//! A patch DTO has to tell three things apart for every nullable column: the
//! field was not sent, it was sent as `null`, or it was sent with a value.
//! `Option<Option<T>>` can express that but reads poorly at call sites, so the
//! update DTOs use [`Patch`] instead.
//!
//! With serde, pair the field with `#[serde(default)]`: a missing key becomes
//! [`Patch::Unset`], an explicit `null` becomes [`Patch::SetNull`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    #[default]
    Unset,
    SetNull,
    SetValue(T),
}

impl<T> Patch<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Patch::Unset)
    }

    /// The value to write when the patch is set, `None` when it is unset.
    pub fn into_update(self) -> Option<Option<T>> {
        match self {
            Patch::Unset => None,
            Patch::SetNull => Some(None),
            Patch::SetValue(value) => Some(Some(value)),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Patch::SetValue(value),
            None => Patch::SetNull,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Patch::SetValue(value) => serializer.serialize_some(value),
            Patch::Unset | Patch::SetNull => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct NotesPatch {
        #[serde(default)]
        notes: Patch<String>,
    }

    #[test]
    fn missing_field_is_unset() {
        let patch: NotesPatch = serde_json::from_str("{}").unwrap();
        assert_eq!(patch.notes, Patch::Unset);
    }

    #[test]
    fn explicit_null_is_set_null() {
        let patch: NotesPatch = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        assert_eq!(patch.notes, Patch::SetNull);
    }

    #[test]
    fn value_is_set_value() {
        let patch: NotesPatch = serde_json::from_str(r#"{"notes": "bring mushaf"}"#).unwrap();
        assert_eq!(patch.notes, Patch::SetValue("bring mushaf".to_string()));
    }

    #[test]
    fn into_update_separates_unset_from_null() {
        assert_eq!(Patch::<String>::Unset.into_update(), None);
        assert_eq!(Patch::<String>::SetNull.into_update(), Some(None));
        assert_eq!(
            Patch::SetValue("new".to_string()).into_update(),
            Some(Some("new".to_string()))
        );
    }
}
