// Conduit API wire types.
// Defines identifiers, the response envelope and the feed and transaction payloads.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{PhabStatsError, Result};

/// Opaque Phabricator object identifier, e.g. `PHID-DREV-abc123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Phid(String);

impl Phid {
    /// Parse any PHID of the form `PHID-<KIND>-<id>`.
    pub fn parse(value: &str) -> Result<Self> {
        let mut parts = value.splitn(3, '-');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("PHID"), Some(kind), Some(id)) if !kind.is_empty() && !id.is_empty() => {
                Ok(Self(value.to_string()))
            }
            _ => Err(PhabStatsError::InvalidPhid {
                expected: "PHID-<KIND>-<id>",
                value: value.to_string(),
            }),
        }
    }

    /// Parse a user PHID (`PHID-USER-...`).
    pub fn user(value: &str) -> Result<Self> {
        let phid = Self::parse(value).map_err(|_| PhabStatsError::InvalidPhid {
            expected: "user",
            value: value.to_string(),
        })?;

        if phid.kind() != "USER" {
            return Err(PhabStatsError::InvalidPhid {
                expected: "user",
                value: value.to_string(),
            });
        }
        Ok(phid)
    }

    /// Object type tag, e.g. `USER` or `DREV`.
    pub fn kind(&self) -> &str {
        self.0.split('-').nth(1).unwrap_or_default()
    }

    /// Whether this PHID names a Differential revision.
    pub fn is_revision(&self) -> bool {
        self.kind() == "DREV"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Response envelope shared by every Conduit method.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub result: Value,
    /// Must be present; `null` means success.
    #[serde(deserialize_with = "Option::deserialize")]
    pub error_code: Option<String>,
    pub error_info: Option<String>,
}

impl Envelope {
    /// Unwrap the result, failing on a remote-reported error.
    pub fn into_result(self) -> Result<Value> {
        match self.error_code {
            None => Ok(self.result),
            Some(code) => Err(PhabStatsError::Remote {
                code,
                info: self.error_info.unwrap_or_default(),
            }),
        }
    }
}

/// Position of a story in the feed. Larger keys are newer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChronologicalKey(pub u64);

impl fmt::Display for ChronologicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Conduit encodes large integers as strings; accept either form.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(u64),
}

impl<'de> Deserialize<'de> for ChronologicalKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::Number(n) => Ok(Self(n)),
            StringOrNumber::String(s) => s
                .parse()
                .map(Self)
                .map_err(|_| serde::de::Error::custom(format!("invalid chronological key {s:?}"))),
        }
    }
}

impl Serialize for ChronologicalKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

/// One activity feed entry.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedStory {
    #[serde(rename = "chronologicalKey")]
    pub chronological_key: ChronologicalKey,
    pub data: StoryData,
}

/// Story payload; only the fields the report needs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoryData {
    #[serde(rename = "objectPHID")]
    pub object_phid: Phid,
}

/// Result of `feed.query`.
///
/// The service returns a map keyed by story PHID, or `[]` when empty.
#[derive(Debug, Clone, Default)]
pub struct FeedPage(pub Vec<FeedStory>);

impl FeedPage {
    pub fn into_stories(self) -> Vec<FeedStory> {
        self.0
    }
}

impl<'de> Deserialize<'de> for FeedPage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Map(HashMap<String, FeedStory>),
            List(Vec<FeedStory>),
            Null(()),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Map(stories) => Self(stories.into_values().collect()),
            Raw::List(stories) => Self(stories),
            Raw::Null(()) => Self::default(),
        })
    }
}

/// One audit-log entry from `transaction.search`.
#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    pub id: u64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(rename = "authorPHID")]
    pub author_phid: Phid,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Transaction {
    pub fn is_comment(&self) -> bool {
        self.kind.as_deref() == Some("comment")
    }
}

/// A comment attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Comment {
    pub id: u64,
    #[serde(rename = "dateCreated")]
    pub date_created: i64,
    #[serde(default)]
    pub removed: bool,
    #[serde(default)]
    pub content: CommentContent,
}

impl Comment {
    /// Raw remarkup text of the comment.
    pub fn raw(&self) -> &str {
        self.content.raw.as_deref().unwrap_or_default()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.date_created, 0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CommentContent {
    #[serde(default)]
    pub raw: Option<String>,
}

/// Result of `transaction.search`.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionPage {
    #[serde(default)]
    pub data: Vec<Transaction>,
    #[serde(default)]
    pub cursor: PageCursor,
}

/// Server-issued pagination cursor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageCursor {
    #[serde(default, deserialize_with = "deserialize_cursor")]
    pub after: Option<String>,
}

fn deserialize_cursor<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.map(|value| match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }),
    )
}
