//! Roster domain types.
//!
//! Defines players, playing positions, and the draft/update inputs coming
//! from the add-player and edit-player forms. Validation and normalization
//! happen here so that nothing invalid ever reaches the store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Store-assigned player identifier (the child key under `players`).
pub type PlayerId = String;

/// Highest jersey number a player may wear.
pub const MAX_JERSEY_NUMBER: i64 = 99;

/// Playing position on the court.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "Point Guard")]
    PointGuard,
    #[serde(rename = "Shooting Guard")]
    ShootingGuard,
    #[serde(rename = "Small Forward")]
    SmallForward,
    #[serde(rename = "Power Forward")]
    PowerForward,
    #[serde(rename = "Center")]
    Center,
}

impl Position {
    /// All positions in the order the roster form lists them.
    pub const ALL: [Self; 5] = [
        Self::PointGuard,
        Self::ShootingGuard,
        Self::SmallForward,
        Self::PowerForward,
        Self::Center,
    ];

    /// Label as stored and displayed.
    pub const fn label(self) -> &'static str {
        match self {
            Self::PointGuard => "Point Guard",
            Self::ShootingGuard => "Shooting Guard",
            Self::SmallForward => "Small Forward",
            Self::PowerForward => "Power Forward",
            Self::Center => "Center",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Position {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        if wanted.is_empty() {
            return Err(ValidationError::MissingPosition);
        }
        Self::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::UnknownPosition(wanted.to_string()))
    }
}

/// Player record exactly as stored at `players/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub number: u8,
    pub position: Position,
    #[serde(
        rename = "photoURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub photo_url: Option<String>,
}

impl PlayerRecord {
    /// Check a record read back from the store.
    ///
    /// Other clients write to the same tree, so stored records are not
    /// trusted to hold the form rules.
    pub fn check(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        if i64::from(self.number) > MAX_JERSEY_NUMBER {
            return Err(ValidationError::NumberOutOfRange(i64::from(self.number)));
        }
        Ok(())
    }

    /// Stored JSON form. The photo field is omitted when there is none.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("name".into(), Value::from(self.name.as_str()));
        map.insert("number".into(), Value::from(self.number));
        map.insert("position".into(), Value::from(self.position.label()));
        if let Some(url) = &self.photo_url {
            map.insert("photoURL".into(), Value::from(url.as_str()));
        }
        Value::Object(map)
    }
}

/// A roster entry: a stored record plus the id it lives under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub number: u8,
    pub position: Position,
    pub photo_url: Option<String>,
}

impl Player {
    /// Attach an id to a decoded record.
    pub fn from_record(id: impl Into<PlayerId>, record: PlayerRecord) -> Self {
        Self {
            id: id.into(),
            name: record.name,
            number: record.number,
            position: record.position,
            photo_url: record.photo_url,
        }
    }

    /// The stored form of this player, without the id.
    pub fn record(&self) -> PlayerRecord {
        PlayerRecord {
            name: self.name.clone(),
            number: self.number,
            position: self.position,
            photo_url: self.photo_url.clone(),
        }
    }

    /// Roster search: case-insensitive match on name or position, or a
    /// substring of the jersey number. An empty query matches everyone.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&query)
            || self.number.to_string().contains(&query)
            || self.position.label().to_lowercase().contains(&query)
    }
}

/// Raw input from the add-player form.
///
/// Fields hold the text as typed; [`PlayerDraft::validate`] trims and
/// coerces them into a [`PlayerRecord`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerDraft {
    pub name: String,
    pub number: String,
    pub position: String,
    pub photo_url: Option<String>,
}

impl PlayerDraft {
    pub fn new(
        name: impl Into<String>,
        number: impl ToString,
        position: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            number: number.to_string(),
            position: position.into(),
            photo_url: None,
        }
    }

    #[must_use]
    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }

    /// Check required fields, then normalize into a storable record.
    ///
    /// Required fields are checked in form order (name, number,
    /// position) before the number's range.
    pub fn validate(&self) -> Result<PlayerRecord, ValidationError> {
        let name = normalize_name(&self.name)?;
        if self.number.trim().is_empty() {
            return Err(ValidationError::MissingNumber);
        }
        if self.position.trim().is_empty() {
            return Err(ValidationError::MissingPosition);
        }
        let number = parse_jersey_number(&self.number)?;
        let position = self.position.parse()?;

        Ok(PlayerRecord {
            name,
            number,
            position,
            photo_url: normalize_photo_url(self.photo_url.as_deref()),
        })
    }
}

/// Partial edit of an existing player.
///
/// `None` leaves a field untouched. `photo_url: Some(None)` removes the
/// photo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerUpdate {
    pub name: Option<String>,
    pub number: Option<String>,
    pub position: Option<String>,
    pub photo_url: Option<Option<String>>,
}

impl PlayerUpdate {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn number(mut self, number: impl ToString) -> Self {
        self.number = Some(number.to_string());
        self
    }

    #[must_use]
    pub fn position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    #[must_use]
    pub fn photo_url(mut self, url: Option<String>) -> Self {
        self.photo_url = Some(url);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.number.is_none()
            && self.position.is_none()
            && self.photo_url.is_none()
    }

    /// Validate the provided fields and return them keyed by their stored
    /// field name. A `null` value marks a field for removal.
    pub fn to_fields(&self) -> Result<Map<String, Value>, ValidationError> {
        let mut fields = Map::new();
        if let Some(name) = &self.name {
            fields.insert("name".into(), Value::from(normalize_name(name)?));
        }
        if let Some(number) = &self.number {
            if number.trim().is_empty() {
                return Err(ValidationError::MissingNumber);
            }
            fields.insert("number".into(), Value::from(parse_jersey_number(number)?));
        }
        if let Some(position) = &self.position {
            let position: Position = position.parse()?;
            fields.insert("position".into(), Value::from(position.label()));
        }
        if let Some(photo_url) = &self.photo_url {
            let value = normalize_photo_url(photo_url.as_deref()).map_or(Value::Null, Value::from);
            fields.insert("photoURL".into(), value);
        }
        Ok(fields)
    }
}

fn normalize_name(raw: &str) -> Result<String, ValidationError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ValidationError::MissingName);
    }
    Ok(name.to_string())
}

fn normalize_photo_url(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|url| !url.is_empty())
        .map(ToString::to_string)
}

/// Parse a jersey number typed as text and check it is in `0..=99`.
///
/// Decimal input is truncated toward zero, so `"4.5"` is jersey 4.
pub fn parse_jersey_number(raw: &str) -> Result<u8, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingNumber);
    }
    let value = match trimmed.parse::<i64>() {
        Ok(value) => value,
        Err(_) => truncate_decimal(trimmed)?,
    };
    if !(0..=MAX_JERSEY_NUMBER).contains(&value) {
        return Err(ValidationError::NumberOutOfRange(value));
    }
    u8::try_from(value).map_err(|_| ValidationError::NumberOutOfRange(value))
}

/// Coerce decimal text such as `"7.0"` to its integer part.
#[allow(clippy::cast_possible_truncation)]
fn truncate_decimal(text: &str) -> Result<i64, ValidationError> {
    let value: f64 = text
        .parse()
        .map_err(|_| ValidationError::InvalidNumber(text.to_string()))?;
    if !value.is_finite() {
        return Err(ValidationError::InvalidNumber(text.to_string()));
    }
    // `as` saturates, huge values still fail the range check.
    Ok(value.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_normalizes_fields() {
        let record = PlayerDraft::new("  Alex  ", " 07 ", "point guard")
            .with_photo_url("  ")
            .validate()
            .unwrap();
        assert_eq!(record.name, "Alex");
        assert_eq!(record.number, 7);
        assert_eq!(record.position, Position::PointGuard);
        assert!(record.photo_url.is_none());
    }

    #[test]
    fn test_draft_missing_fields_in_form_order() {
        let err = PlayerDraft::new("", "", "").validate().unwrap_err();
        assert_eq!(err, ValidationError::MissingName);

        let err = PlayerDraft::new("Sam", "", "").validate().unwrap_err();
        assert_eq!(err, ValidationError::MissingNumber);

        let err = PlayerDraft::new("Sam", "5", " ").validate().unwrap_err();
        assert_eq!(err, ValidationError::MissingPosition);
    }

    #[test]
    fn test_draft_rejects_bad_numbers() {
        let err = PlayerDraft::new("Sam", "150", "Center").validate().unwrap_err();
        assert_eq!(err, ValidationError::NumberOutOfRange(150));

        let err = PlayerDraft::new("Sam", "-1", "Center").validate().unwrap_err();
        assert_eq!(err, ValidationError::NumberOutOfRange(-1));

        let err = PlayerDraft::new("Sam", "seven", "Center").validate().unwrap_err();
        assert_eq!(err, ValidationError::InvalidNumber("seven".to_string()));

        let err = PlayerDraft::new("Sam", "inf", "Center").validate().unwrap_err();
        assert_eq!(err, ValidationError::InvalidNumber("inf".to_string()));
    }

    #[test]
    fn test_decimal_numbers_truncate() {
        let record = PlayerDraft::new("Sam", "4.5", "Center").validate().unwrap();
        assert_eq!(record.number, 4);
        let record = PlayerDraft::new("Sam", " 7.0 ", "Center").validate().unwrap();
        assert_eq!(record.number, 7);
        let record = PlayerDraft::new("Sam", "99.9", "Center").validate().unwrap();
        assert_eq!(record.number, 99);

        let err = PlayerDraft::new("Sam", "100.5", "Center").validate().unwrap_err();
        assert_eq!(err, ValidationError::NumberOutOfRange(100));
    }

    #[test]
    fn test_stored_record_check() {
        let mut record = PlayerDraft::new("Alex", 7, "Center").validate().unwrap();
        assert!(record.check().is_ok());

        record.number = 150;
        assert_eq!(record.check(), Err(ValidationError::NumberOutOfRange(150)));

        record.number = 7;
        record.name = "  ".to_string();
        assert_eq!(record.check(), Err(ValidationError::MissingName));
    }

    #[test]
    fn test_unknown_position() {
        let err = PlayerDraft::new("Sam", 5, "Goalkeeper").validate().unwrap_err();
        assert_eq!(err, ValidationError::UnknownPosition("Goalkeeper".to_string()));
    }

    #[test]
    fn test_record_wire_format() {
        let record = PlayerRecord {
            name: "Alex".to_string(),
            number: 7,
            position: Position::SmallForward,
            photo_url: Some("https://example.com/a.png".to_string()),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(record.to_value(), json);
        assert_eq!(
            json,
            serde_json::json!({
                "name": "Alex",
                "number": 7,
                "position": "Small Forward",
                "photoURL": "https://example.com/a.png"
            })
        );

        let no_photo: PlayerRecord = serde_json::from_value(serde_json::json!({
            "name": "Jo", "number": 0, "position": "Center"
        }))
        .unwrap();
        assert!(no_photo.photo_url.is_none());
        assert!(!serde_json::to_string(&no_photo).unwrap().contains("photoURL"));
    }

    #[test]
    fn test_update_fields() {
        let fields = PlayerUpdate::default()
            .name(" Alexis ")
            .photo_url(None)
            .to_fields()
            .unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["name"], "Alexis");
        assert!(fields["photoURL"].is_null());

        let err = PlayerUpdate::default().number(100).to_fields().unwrap_err();
        assert_eq!(err, ValidationError::NumberOutOfRange(100));
        assert!(PlayerUpdate::default().is_empty());
    }

    #[test]
    fn test_search_matches() {
        let player = Player::from_record(
            "p1",
            PlayerRecord {
                name: "Jordan Miles".to_string(),
                number: 23,
                position: Position::ShootingGuard,
                photo_url: None,
            },
        );
        assert!(player.matches(""));
        assert!(player.matches("jordan"));
        assert!(player.matches("3"));
        assert!(player.matches("GUARD"));
        assert!(!player.matches("center"));
    }
}
