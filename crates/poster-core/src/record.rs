//! Poster record types
//!
//! A poster record is the structured output of an extraction pipeline:
//! artist/tour metadata plus an ordered list of events. Ground-truth records
//! are deserialized strictly; predictions that do not conform to the schema
//! are read through [`StructuredRecord::from_value_lenient`] so they can
//! still be scored.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{BenchError, Result};

// ============================================================================
// Event Status
// ============================================================================

/// Lifecycle status of a single event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Active,
    Cancelled,
    Postponed,
}

impl EventStatus {
    /// All accepted statuses, in schema order
    pub const ALL: [EventStatus; 3] = [Self::Active, Self::Cancelled, Self::Postponed];

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
            Self::Postponed => "postponed",
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "cancelled" => Ok(Self::Cancelled),
            "postponed" => Ok(Self::Postponed),
            other => Err(BenchError::InvalidRecord(format!(
                "unknown event status: {other}"
            ))),
        }
    }
}

// ============================================================================
// Field Identifiers
// ============================================================================

/// Top-level poster fields that take part in metadata scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopLevelField {
    ArtistName,
    InstagramHandle,
    TourName,
    ContactInfo,
    SourceMonth,
}

impl TopLevelField {
    pub const ALL: [TopLevelField; 5] = [
        Self::ArtistName,
        Self::InstagramHandle,
        Self::TourName,
        Self::ContactInfo,
        Self::SourceMonth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ArtistName => "artist_name",
            Self::InstagramHandle => "instagram_handle",
            Self::TourName => "tour_name",
            Self::ContactInfo => "contact_info",
            Self::SourceMonth => "source_month",
        }
    }
}

/// Event fields that take part in event similarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventField {
    Date,
    Time,
    Venue,
    City,
    Province,
    Country,
    EventName,
    TicketInfo,
    Status,
}

impl EventField {
    pub const ALL: [EventField; 9] = [
        Self::Date,
        Self::Time,
        Self::Venue,
        Self::City,
        Self::Province,
        Self::Country,
        Self::EventName,
        Self::TicketInfo,
        Self::Status,
    ];

    /// Fields that must be filled in for an event to be usable
    pub const ESSENTIAL: [EventField; 4] = [Self::Date, Self::Venue, Self::City, Self::Province];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Time => "time",
            Self::Venue => "venue",
            Self::City => "city",
            Self::Province => "province",
            Self::Country => "country",
            Self::EventName => "event_name",
            Self::TicketInfo => "ticket_info",
            Self::Status => "status",
        }
    }

    /// Whether this field is compared by exact normalized equality
    /// rather than fuzzy sequence similarity
    pub fn is_exact(&self) -> bool {
        matches!(self, Self::Date | Self::Time | Self::Country | Self::Status)
    }
}

// ============================================================================
// Records
// ============================================================================

/// A single event listed on a poster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event date (YYYY-MM-DD)
    pub date: String,
    pub event_name: Option<String>,
    pub venue: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub country: String,
    /// Start time (HH:MM)
    pub time: Option<String>,
    pub ticket_info: Option<String>,
    /// `None` only when read leniently from a value with a missing or unknown status
    pub status: Option<EventStatus>,
    /// Extraction confidence in [0, 1]
    pub confidence: Option<f64>,
}

impl EventRecord {
    /// Create an active event with only the identifying fields set
    pub fn new(date: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            event_name: None,
            venue: None,
            city: None,
            province: None,
            country: country.into(),
            time: None,
            ticket_info: None,
            status: Some(EventStatus::Active),
            confidence: None,
        }
    }

    /// Set the venue
    pub fn with_venue(mut self, venue: impl Into<String>) -> Self {
        self.venue = Some(venue.into());
        self
    }

    /// Set city and province
    pub fn with_location(mut self, city: impl Into<String>, province: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self.province = Some(province.into());
        self
    }

    /// Set the event name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.event_name = Some(name.into());
        self
    }

    /// Set the start time
    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    /// Set the status
    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Raw text of a field, `None` when the field is null
    pub fn text(&self, field: EventField) -> Option<&str> {
        match field {
            EventField::Date => Some(self.date.as_str()),
            EventField::Time => self.time.as_deref(),
            EventField::Venue => self.venue.as_deref(),
            EventField::City => self.city.as_deref(),
            EventField::Province => self.province.as_deref(),
            EventField::Country => Some(self.country.as_str()),
            EventField::EventName => self.event_name.as_deref(),
            EventField::TicketInfo => self.ticket_info.as_deref(),
            EventField::Status => self.status.as_ref().map(EventStatus::as_str),
        }
    }

    /// Whether a field is null or whitespace-only
    pub fn is_blank(&self, field: EventField) -> bool {
        self.text(field).map_or(true, |value| value.trim().is_empty())
    }

    fn from_object_lenient(object: &Map<String, Value>) -> Self {
        Self {
            date: lenient_text(object, "date").unwrap_or_default(),
            event_name: lenient_text(object, "event_name"),
            venue: lenient_text(object, "venue"),
            city: lenient_text(object, "city"),
            province: lenient_text(object, "province"),
            country: lenient_text(object, "country").unwrap_or_default(),
            time: lenient_text(object, "time"),
            ticket_info: lenient_text(object, "ticket_info"),
            status: lenient_text(object, "status").and_then(|s| s.parse().ok()),
            confidence: object.get("confidence").and_then(Value::as_f64),
        }
    }
}

/// A poster record: artist/tour metadata plus its events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredRecord {
    pub artist_name: String,
    pub instagram_handle: Option<String>,
    pub tour_name: Option<String>,
    pub contact_info: Option<String>,
    /// Month the poster was published (YYYY-MM)
    pub source_month: String,
    /// Extraction confidence in [0, 1]
    pub poster_confidence: Option<f64>,
    pub events: Vec<EventRecord>,
}

impl StructuredRecord {
    /// Create a record with no optional metadata and no events
    pub fn new(artist_name: impl Into<String>, source_month: impl Into<String>) -> Self {
        Self {
            artist_name: artist_name.into(),
            instagram_handle: None,
            tour_name: None,
            contact_info: None,
            source_month: source_month.into(),
            poster_confidence: None,
            events: Vec::new(),
        }
    }

    /// Parse a conforming record from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a record from an arbitrary JSON value without rejecting it.
    ///
    /// Returns `None` for non-objects. Missing or null fields become `None`
    /// (or empty for required strings), non-string scalars are stringified,
    /// non-object events are skipped, and unknown statuses become `None`.
    pub fn from_value_lenient(value: &Value) -> Option<Self> {
        let object = value.as_object()?;

        let events = match object.get("events") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_object)
                .map(EventRecord::from_object_lenient)
                .collect(),
            _ => Vec::new(),
        };

        Some(Self {
            artist_name: lenient_text(object, "artist_name").unwrap_or_default(),
            instagram_handle: lenient_text(object, "instagram_handle"),
            tour_name: lenient_text(object, "tour_name"),
            contact_info: lenient_text(object, "contact_info"),
            source_month: lenient_text(object, "source_month").unwrap_or_default(),
            poster_confidence: object.get("poster_confidence").and_then(Value::as_f64),
            events,
        })
    }

    /// Convert to a JSON value with every schema key present
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Raw text of a top-level field, `None` when the field is null
    pub fn text(&self, field: TopLevelField) -> Option<&str> {
        match field {
            TopLevelField::ArtistName => Some(self.artist_name.as_str()),
            TopLevelField::InstagramHandle => self.instagram_handle.as_deref(),
            TopLevelField::TourName => self.tour_name.as_deref(),
            TopLevelField::ContactInfo => self.contact_info.as_deref(),
            TopLevelField::SourceMonth => Some(self.source_month.as_str()),
        }
    }
}

fn lenient_text(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
