//! Normalizer: reduces the frontend's submission shapes to one flat record.
//!
//! Submissions arrive as `{ tool, organization, <tool>Data: {...} }`, wrapped
//! in a one-element array by some clients, or already in the flat shape the
//! webhook consumes. Whatever comes in, the output is a one-element list of
//! [`CanonicalRecord`] whose fields are all primitives.

use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::coerce::{to_bool_or_false, to_number_or_zero, to_string_list, to_string_or_empty};

// Together with `tool`, any of these marks a submission as already canonical.
pub const FLAT_KEYS: &[&str] = &[
    "topic",
    "details",
    "idea",
    "content",
    "input_text",
    "inputText",
    "platforms",
    "rhetoric_pattern",
    "duration_minutes",
];

const QUOTE_SLOTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolKind {
    Press,
    Motion,
    Speech,
    Social,
    #[default]
    Generic,
}

impl ToolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Press => "press",
            ToolKind::Motion => "motion",
            ToolKind::Speech => "speech",
            ToolKind::Social => "social",
            ToolKind::Generic => "generic",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown tool kind '{0}' (expected press, motion, speech, social or generic)")]
pub struct UnknownToolKind(pub String);

impl FromStr for ToolKind {
    type Err = UnknownToolKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "press" => Ok(ToolKind::Press),
            "motion" => Ok(ToolKind::Motion),
            "speech" => Ok(ToolKind::Speech),
            "social" => Ok(ToolKind::Social),
            "generic" => Ok(ToolKind::Generic),
            other => Err(UnknownToolKind(other.to_string())),
        }
    }
}

/// Decisions the normalizer leaves to deployment.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizePolicy {
    /// Kind used when `tool` is absent or not one of the known names.
    /// Older frontends omitted `tool` for press releases; set this to
    /// [`ToolKind::Press`] to keep serving them.
    pub default_tool: ToolKind,
}

// --- Nested sub-schemas (what the frontend sends) ---

#[derive(Debug, Default)]
struct Quote {
    name: String,
    function: String,
}

#[derive(Debug, Default)]
struct Contact {
    name: String,
    function: String,
    details: String,
}

#[derive(Debug, Default)]
struct PressData {
    topic: String,
    details: String,
    quotes: [Quote; QUOTE_SLOTS],
    contact: Contact,
    include_organization: bool,
    organization_unit: String,
}

impl PressData {
    fn from_value(data: Option<&Value>) -> Self {
        let quotes = data
            .and_then(|d| d.get("quotes"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let quote = |i: usize| {
            let q = quotes.get(i);
            Quote {
                name: to_string_or_empty(q.and_then(|q| q.get("name"))),
                function: to_string_or_empty(q.and_then(|q| q.get("function"))),
            }
        };
        let contact = data.and_then(|d| d.get("contact"));

        Self {
            topic: to_string_or_empty(field(data, "topic")),
            details: to_string_or_empty(field(data, "details")),
            quotes: [quote(0), quote(1), quote(2)],
            contact: Contact {
                name: to_string_or_empty(field(contact, "name")),
                function: to_string_or_empty(field(contact, "function")),
                details: to_string_or_empty(field(contact, "contactDetails")),
            },
            include_organization: to_bool_or_false(field(data, "includeOrganization")),
            organization_unit: to_string_or_empty(field(data, "organizationUnit")),
        }
    }
}

#[derive(Debug, Default)]
struct MotionData {
    idea: String,
    details: String,
    include_research: bool,
}

impl MotionData {
    fn from_value(data: Option<&Value>) -> Self {
        Self {
            idea: to_string_or_empty(field(data, "idea")),
            details: to_string_or_empty(field(data, "details")),
            include_research: to_bool_or_false(field(data, "includeResearch")),
        }
    }
}

#[derive(Debug)]
struct SpeechData {
    topic: String,
    rhetoric_pattern: String,
    duration_minutes: Number,
}

impl SpeechData {
    fn from_value(data: Option<&Value>) -> Self {
        // Some form widgets submit the duration as a single-item list.
        let duration = match field(data, "duration") {
            Some(Value::Array(items)) => items.first(),
            other => other,
        };
        Self {
            topic: to_string_or_empty(field(data, "topic")),
            rhetoric_pattern: to_string_or_empty(field(data, "rhetoricPattern")),
            duration_minutes: to_number_or_zero(duration),
        }
    }
}

#[derive(Debug, Default)]
struct SocialData {
    platforms: Vec<String>,
    topic: String,
    content: String,
    include_organization: bool,
    organization_unit: String,
}

impl SocialData {
    fn from_value(data: Option<&Value>) -> Self {
        Self {
            platforms: to_string_list(field(data, "platforms")),
            topic: to_string_or_empty(field(data, "topic")),
            content: to_string_or_empty(field(data, "content")),
            include_organization: to_bool_or_false(field(data, "includeOrganization")),
            organization_unit: to_string_or_empty(field(data, "organizationUnit")),
        }
    }
}

fn field<'a>(parent: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    parent.and_then(|p| p.get(key))
}

// --- Flat records (what the webhook receives) ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PressRecord {
    pub tool: String,
    pub organization: String,
    pub topic: String,
    pub details: String,
    pub quote1_name: String,
    pub quote1_function: String,
    pub quote2_name: String,
    pub quote2_function: String,
    pub quote3_name: String,
    pub quote3_function: String,
    pub contact_name: String,
    pub contact_function: String,
    pub contact_details: String,
    pub include_organization: bool,
    pub organization_unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MotionRecord {
    pub tool: String,
    pub organization: String,
    pub idea: String,
    pub details: String,
    pub include_research: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeechRecord {
    pub tool: String,
    pub organization: String,
    pub topic: String,
    pub rhetoric_pattern: String,
    pub duration_minutes: Number,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SocialRecord {
    pub tool: String,
    pub organization: String,
    pub platforms: Vec<String>,
    pub topic: String,
    pub content: String,
    pub include_organization: bool,
    pub organization_unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenericRecord {
    pub tool: String,
    pub organization: String,
    pub input_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CanonicalRecord {
    // client already sent the canonical shape
    Flat(Map<String, Value>),
    Press(PressRecord),
    Motion(MotionRecord),
    Speech(SpeechRecord),
    Social(SocialRecord),
    Generic(GenericRecord),
}

pub fn normalize(raw: &Value) -> Vec<CanonicalRecord> {
    normalize_with(raw, &NormalizePolicy::default())
}

/// Always returns exactly one record.
pub fn normalize_with(raw: &Value, policy: &NormalizePolicy) -> Vec<CanonicalRecord> {
    let unwrapped = match raw {
        Value::Array(items) => items.first(),
        other => Some(other),
    };
    let obj = unwrapped.and_then(Value::as_object);

    if let Some(obj) = obj {
        if is_already_flat(obj) {
            debug!("submission already canonical, skipping derivation");
            return vec![CanonicalRecord::Flat(obj.clone())];
        }
    }

    let tool_value = obj.and_then(|o| o.get("tool"));
    let kind = tool_value
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<ToolKind>().ok())
        .unwrap_or(policy.default_tool);
    let tool = match tool_value {
        Some(Value::String(s)) => s.clone(),
        _ => kind.as_str().to_string(),
    };
    let organization = to_string_or_empty(obj.and_then(|o| o.get("organization")));

    debug!(tool = %tool, kind = %kind, "deriving canonical record");

    let record = match kind {
        ToolKind::Press => {
            let data = PressData::from_value(field(unwrapped, "pressData"));
            let [q1, q2, q3] = data.quotes;
            CanonicalRecord::Press(PressRecord {
                tool,
                organization,
                topic: data.topic,
                details: data.details,
                quote1_name: q1.name,
                quote1_function: q1.function,
                quote2_name: q2.name,
                quote2_function: q2.function,
                quote3_name: q3.name,
                quote3_function: q3.function,
                contact_name: data.contact.name,
                contact_function: data.contact.function,
                contact_details: data.contact.details,
                include_organization: data.include_organization,
                organization_unit: data.organization_unit,
            })
        }
        ToolKind::Motion => {
            let data = MotionData::from_value(field(unwrapped, "motionData"));
            CanonicalRecord::Motion(MotionRecord {
                tool,
                organization,
                idea: data.idea,
                details: data.details,
                include_research: data.include_research,
            })
        }
        ToolKind::Speech => {
            let data = SpeechData::from_value(field(unwrapped, "speechData"));
            CanonicalRecord::Speech(SpeechRecord {
                tool,
                organization,
                topic: data.topic,
                rhetoric_pattern: data.rhetoric_pattern,
                duration_minutes: data.duration_minutes,
            })
        }
        ToolKind::Social => {
            let data = SocialData::from_value(field(unwrapped, "socialData"));
            CanonicalRecord::Social(SocialRecord {
                tool,
                organization,
                platforms: data.platforms,
                topic: data.topic,
                content: data.content,
                include_organization: data.include_organization,
                organization_unit: data.organization_unit,
            })
        }
        ToolKind::Generic => {
            let text = field(unwrapped, "inputText")
                .filter(|v| v.is_string())
                .or_else(|| field(unwrapped, "text"));
            CanonicalRecord::Generic(GenericRecord {
                tool,
                organization,
                input_text: to_string_or_empty(text),
            })
        }
    };

    vec![record]
}

fn is_already_flat(obj: &Map<String, Value>) -> bool {
    obj.contains_key("tool") && FLAT_KEYS.iter().any(|key| obj.contains_key(*key))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Records(Vec<CanonicalRecord>),
    Text(String),
}

impl Payload {
    // Non-JSON bodies and bare JSON strings pass through as text.
    pub fn from_body(body: String, policy: &NormalizePolicy) -> Self {
        match serde_json::from_str::<Value>(&body) {
            Ok(Value::String(text)) => Payload::Text(text),
            Ok(raw) => Payload::Records(normalize_with(&raw, policy)),
            Err(_) => Payload::Text(body),
        }
    }

    pub fn into_body(self) -> Result<String, serde_json::Error> {
        match self {
            Payload::Records(records) => serde_json::to_string(&records),
            Payload::Text(text) => Ok(text),
        }
    }
}
