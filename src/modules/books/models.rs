use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

use bookshelf_db::Row;

/// Storage-assigned identifier of a book.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Physical condition of a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Condition {
    pub const ALL: [Condition; 4] = [
        Condition::Excellent,
        Condition::Good,
        Condition::Fair,
        Condition::Poor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Excellent => "excellent",
            Condition::Good => "good",
            Condition::Fair => "fair",
            Condition::Poor => "poor",
        }
    }

    /// Star rating shown next to the condition, out of five.
    pub fn stars(&self) -> u8 {
        match self {
            Condition::Excellent => 5,
            Condition::Good => 4,
            Condition::Fair => 3,
            Condition::Poor => 2,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Condition::Excellent => "Like new, no visible wear",
            Condition::Good => "Minor wear, well-maintained",
            Condition::Fair => "Moderate wear, still readable",
            Condition::Poor => "Heavy wear, but functional",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown condition '{0}'; expected excellent/good/fair/poor")]
pub struct ParseConditionError(String);

impl FromStr for Condition {
    type Err = ParseConditionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Condition::ALL
            .into_iter()
            .find(|condition| condition.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| ParseConditionError(value.to_string()))
    }
}

/// A book as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    /// Empty when storage holds no description.
    pub description: String,
    pub genre: Option<String>,
    pub condition: Condition,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Row shape of the `books` table; nullable text columns stay optional.
#[derive(Debug, Deserialize)]
struct BookRow {
    id: String,
    title: String,
    author: String,
    description: Option<String>,
    genre: Option<String>,
    condition: Condition,
    notes: Option<String>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    created_at: OffsetDateTime,
    #[serde(deserialize_with = "timestamp::deserialize")]
    updated_at: OffsetDateTime,
}

/// Timestamps as storage hands them back.
mod timestamp {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};
    use time::format_description::well_known::Rfc3339;
    use time::macros::format_description;
    use time::{OffsetDateTime, PrimitiveDateTime};

    /// RFC 3339, or a `timestamp` column without offset, read as UTC.
    pub(super) fn parse(text: &str) -> Option<OffsetDateTime> {
        if let Ok(stamp) = OffsetDateTime::parse(text, &Rfc3339) {
            return Some(stamp);
        }

        let iso = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]");
        let sql = format_description!("[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]");
        PrimitiveDateTime::parse(text, iso)
            .or_else(|_| PrimitiveDateTime::parse(text, sql))
            .ok()
            .map(PrimitiveDateTime::assume_utc)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        parse(&text).ok_or_else(|| D::Error::custom(format!("unrecognized timestamp '{text}'")))
    }
}

impl Book {
    /// Decode a row returned by storage.
    ///
    /// Null `description` becomes an empty string; null or empty `genre` and
    /// `notes` become `None`.
    pub fn from_row(row: Row) -> Result<Self, serde_json::Error> {
        let row: BookRow = serde_json::from_value(Value::Object(row))?;
        Ok(Self {
            id: BookId(row.id),
            title: row.title,
            author: row.author,
            description: row.description.unwrap_or_default(),
            genre: row.genre.filter(|genre| !genre.is_empty()),
            condition: row.condition,
            notes: row.notes.filter(|notes| !notes.is_empty()),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Input rejected before it reaches storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
}

/// Fields supplied when adding a book; storage assigns the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub condition: Condition,
    pub notes: Option<String>,
}

impl NewBook {
    pub fn new(title: impl Into<String>, author: impl Into<String>, condition: Condition) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            description: None,
            genre: None,
            condition,
            notes: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingField("title"));
        }
        if self.author.trim().is_empty() {
            return Err(ValidationError::MissingField("author"));
        }
        Ok(())
    }

    /// Insert row; empty optional text goes out as null.
    pub fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("title".into(), Value::String(self.title.clone()));
        row.insert("author".into(), Value::String(self.author.clone()));
        row.insert("description".into(), optional_text(self.description.as_deref()));
        row.insert("genre".into(), optional_text(self.genre.as_deref()));
        row.insert("condition".into(), Value::String(self.condition.as_str().into()));
        row.insert("notes".into(), optional_text(self.notes.as_deref()));
        row
    }
}

fn optional_text(value: Option<&str>) -> Value {
    match value {
        Some(text) if !text.is_empty() => Value::String(text.to_string()),
        _ => Value::Null,
    }
}

/// Change to one optional text column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldUpdate<T> {
    /// Leave the stored value as it is.
    #[default]
    Keep,
    /// Store null.
    Clear,
    Set(T),
}

impl FieldUpdate<String> {
    /// Form-style input: an empty string clears the field.
    pub fn from_input(value: impl Into<String>) -> Self {
        let value: String = value.into();
        if value.is_empty() {
            FieldUpdate::Clear
        } else {
            FieldUpdate::Set(value)
        }
    }

    fn write_to(&self, row: &mut Row, column: &str) {
        match self {
            FieldUpdate::Keep => {}
            FieldUpdate::Clear => {
                row.insert(column.to_string(), Value::Null);
            }
            FieldUpdate::Set(value) => {
                row.insert(column.to_string(), Value::String(value.clone()));
            }
        }
    }
}

/// Partial update of a stored book. Untouched fields are not sent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: FieldUpdate<String>,
    pub genre: FieldUpdate<String>,
    pub condition: Option<Condition>,
    pub notes: FieldUpdate<String>,
}

impl BookPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = FieldUpdate::from_input(description);
        self
    }

    pub fn genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = FieldUpdate::from_input(genre);
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = FieldUpdate::from_input(notes);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Title and author may be changed but not blanked.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if matches!(&self.title, Some(title) if title.trim().is_empty()) {
            return Err(ValidationError::MissingField("title"));
        }
        if matches!(&self.author, Some(author) if author.trim().is_empty()) {
            return Err(ValidationError::MissingField("author"));
        }
        Ok(())
    }

    /// Update row holding only the fields this patch touches.
    pub fn to_row(&self) -> Row {
        let mut row = Row::new();
        if let Some(title) = &self.title {
            row.insert("title".into(), Value::String(title.clone()));
        }
        if let Some(author) = &self.author {
            row.insert("author".into(), Value::String(author.clone()));
        }
        self.description.write_to(&mut row, "description");
        self.genre.write_to(&mut row, "genre");
        if let Some(condition) = self.condition {
            row.insert("condition".into(), Value::String(condition.as_str().into()));
        }
        self.notes.write_to(&mut row, "notes");
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stored_row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn condition_parses_case_insensitively() {
        assert_eq!("Good".parse::<Condition>().unwrap(), Condition::Good);
        assert_eq!(" poor ".parse::<Condition>().unwrap(), Condition::Poor);
        assert!("mint".parse::<Condition>().is_err());
    }

    #[test]
    fn row_nulls_map_to_empty_description_and_absent_options() {
        let book = Book::from_row(stored_row(json!({
            "id": "b1",
            "title": "Dune",
            "author": "Herbert",
            "description": null,
            "genre": null,
            "condition": "good",
            "notes": "",
            "created_at": "2024-05-01T10:00:00.123456+00:00",
            "updated_at": "2024-05-01T10:00:00.123456+00:00",
        })))
        .unwrap();

        assert_eq!(book.id.as_str(), "b1");
        assert_eq!(book.description, "");
        assert_eq!(book.genre, None);
        assert_eq!(book.notes, None);
        assert_eq!(book.condition, Condition::Good);
    }

    #[test]
    fn row_timestamps_without_offset_read_as_utc() {
        let book = Book::from_row(stored_row(json!({
            "id": "b1",
            "title": "Dune",
            "author": "Herbert",
            "condition": "good",
            "created_at": "2024-05-01T10:00:00.123456",
            "updated_at": "2024-05-01 11:30:00",
        })))
        .unwrap();

        assert_eq!(book.created_at, time::macros::datetime!(2024-05-01 10:00:00.123456 UTC));
        assert_eq!(book.updated_at, time::macros::datetime!(2024-05-01 11:30:00 UTC));
        assert!(timestamp::parse("yesterday").is_none());
    }

    #[test]
    fn row_with_unknown_condition_is_rejected() {
        let result = Book::from_row(stored_row(json!({
            "id": "b1",
            "title": "Dune",
            "author": "Herbert",
            "condition": "mint",
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:00:00Z",
        })));
        assert!(result.is_err());
    }

    #[test]
    fn new_book_requires_title_and_author() {
        let missing_title = NewBook::new("  ", "Herbert", Condition::Good);
        assert_eq!(
            missing_title.validate(),
            Err(ValidationError::MissingField("title"))
        );

        let missing_author = NewBook::new("Dune", "", Condition::Good);
        assert_eq!(
            missing_author.validate(),
            Err(ValidationError::MissingField("author"))
        );
    }

    #[test]
    fn new_book_row_sends_blank_optionals_as_null() {
        let row = NewBook::new("Dune", "Herbert", Condition::Good)
            .description("")
            .genre("Science Fiction")
            .to_row();

        assert_eq!(row["description"], Value::Null);
        assert_eq!(row["genre"], json!("Science Fiction"));
        assert_eq!(row["notes"], Value::Null);
        assert_eq!(row["condition"], json!("good"));
    }

    #[test]
    fn only_empty_text_counts_as_absent() {
        let row = NewBook::new("Dune", "Herbert", Condition::Good)
            .notes("   ")
            .to_row();
        assert_eq!(row["notes"], json!("   "));

        assert_eq!(FieldUpdate::from_input(""), FieldUpdate::Clear);
        assert_eq!(
            FieldUpdate::from_input(" "),
            FieldUpdate::Set(" ".to_string())
        );
    }

    #[test]
    fn patch_row_holds_only_touched_fields() {
        let row = BookPatch::new().title("Dune Messiah").genre("").to_row();

        assert_eq!(row.len(), 2);
        assert_eq!(row["title"], json!("Dune Messiah"));
        assert_eq!(row["genre"], Value::Null);
    }

    #[test]
    fn keep_and_clear_are_distinct() {
        let keep = BookPatch::new();
        let clear = BookPatch {
            notes: FieldUpdate::Clear,
            ..BookPatch::default()
        };

        assert!(keep.is_empty());
        assert!(keep.to_row().is_empty());
        assert_eq!(clear.to_row()["notes"], Value::Null);
    }

    #[test]
    fn patch_cannot_blank_title() {
        assert_eq!(
            BookPatch::new().title("").validate(),
            Err(ValidationError::MissingField("title"))
        );
    }
}
