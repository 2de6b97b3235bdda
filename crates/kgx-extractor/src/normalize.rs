//! Relation normalization
//!
//! Converts loosely structured relation-extraction output into validated
//! `RelationMention` records. Backends disagree on shape: some emit
//! positional sequences, some emit mappings under varying key names, and
//! endpoint references range from positional indices to partial descriptors.
//! Everything that cannot be decoded and resolved is silently dropped;
//! data-quality problems in one item never abort the batch.

use serde_json::{json, Map, Value};

use kgx_core::{EntityMention, IdSource, RelationEndpoint, RelationMention, UuidIds};

/// Key aliases accepted for the fields of a mapping-shaped relation item
const TYPE_KEYS: [&str; 3] = ["relation", "type", "label"];
const SCORE_KEYS: [&str; 2] = ["confidence", "score"];
const HEAD_KEYS: [&str; 3] = ["head", "subject", "source"];
const TAIL_KEYS: [&str; 3] = ["tail", "object", "target"];

// ============================================================================
// Raw item decoding
// ============================================================================

/// One relation item as produced by a backend, before validation.
///
/// The accepted shapes form a closed set; anything matching neither variant
/// is unparseable and skipped.
#[derive(Debug, Clone)]
enum RawRelationItem<'a> {
    /// Sequence shape: `(head, tail, type, [score])`
    Positional {
        head: &'a Value,
        tail: &'a Value,
        kind: &'a Value,
        score: Option<&'a Value>,
    },
    /// Mapping shape with key aliases (see the `*_KEYS` tables)
    Record {
        kind: Option<&'a Value>,
        score: Option<&'a Value>,
        head: Option<&'a Value>,
        tail: Option<&'a Value>,
        evidence: Option<&'a Value>,
    },
}

impl<'a> RawRelationItem<'a> {
    fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Array(items) if items.len() >= 3 => Some(Self::Positional {
                head: &items[0],
                tail: &items[1],
                kind: &items[2],
                score: items.get(3),
            }),
            Value::Object(map) => Some(Self::Record {
                kind: first_of(map, &TYPE_KEYS),
                score: first_of(map, &SCORE_KEYS),
                head: first_of(map, &HEAD_KEYS),
                tail: first_of(map, &TAIL_KEYS),
                evidence: map.get("evidence"),
            }),
            _ => None,
        }
    }
}

fn first_of<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| map.get(*key))
}

// ============================================================================
// Endpoint resolution
// ============================================================================

/// A backend-supplied pointer to a relation endpoint, before resolution
#[derive(Debug, Clone)]
enum EndpointRef<'a> {
    /// Positional index into the entity sequence
    Index(i64),
    /// Entity id, or failing that, entity surface text
    Name(&'a str),
    /// Partial descriptor mapping
    Descriptor(&'a Map<String, Value>),
}

impl<'a> EndpointRef<'a> {
    fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Index),
            Value::String(s) => Some(Self::Name(s)),
            Value::Object(map) => Some(Self::Descriptor(map)),
            _ => None,
        }
    }
}

/// Resolve an endpoint reference to the id of an entity mention.
///
/// Rules are tried in order and the first one that fires is terminal, even
/// when its search yields no match. Matches are exact; no casing or
/// whitespace normalization is applied.
pub fn resolve_endpoint(reference: &Value, entities: &[EntityMention]) -> Option<String> {
    match EndpointRef::from_value(reference)? {
        EndpointRef::Index(index) => {
            let index = usize::try_from(index).ok()?;
            entities.get(index).map(|e| e.id.clone())
        }
        EndpointRef::Name(name) => entities
            .iter()
            .find(|e| e.id == name)
            .or_else(|| entities.iter().find(|e| e.text == name))
            .map(|e| e.id.clone()),
        EndpointRef::Descriptor(descriptor) => resolve_descriptor(descriptor, entities),
    }
}

fn resolve_descriptor(descriptor: &Map<String, Value>, entities: &[EntityMention]) -> Option<String> {
    // Explicit ids are trusted verbatim; the backend vouches for them.
    if let Some(id) = descriptor.get("mention_id") {
        return id.as_str().map(str::to_owned);
    }
    if let Some(id) = descriptor.get("id") {
        return id.as_str().map(str::to_owned);
    }

    if descriptor.contains_key("start") && descriptor.contains_key("end") {
        let start = descriptor.get("start").and_then(Value::as_u64);
        let end = descriptor.get("end").and_then(Value::as_u64);
        return match (start, end) {
            (Some(start), Some(end)) => entities
                .iter()
                .find(|e| e.start == Some(start as usize) && e.end == Some(end as usize))
                .map(|e| e.id.clone()),
            _ => None,
        };
    }

    if descriptor.contains_key("label") && descriptor.contains_key("text") {
        let label = descriptor.get("label").and_then(Value::as_str);
        let text = descriptor.get("text").and_then(Value::as_str);
        return match (label, text) {
            (Some(label), Some(text)) => entities
                .iter()
                .find(|e| e.label == label && e.text == text)
                .map(|e| e.id.clone()),
            _ => None,
        };
    }

    if let Some(text) = descriptor.get("text") {
        let text = text.as_str()?;
        return entities.iter().find(|e| e.text == text).map(|e| e.id.clone());
    }

    None
}

// ============================================================================
// Evidence synthesis
// ============================================================================

/// Derive span/snippet evidence for a relation between two mentions.
///
/// Backend-supplied evidence carrying both `span` and `snippet` is
/// authoritative and returned unchanged. Otherwise the covering span of the
/// two mentions is computed and filled in around whatever partial keys the
/// backend supplied. Returns `None` only when there was neither supplied
/// evidence nor offsets on either mention.
pub fn synthesize_evidence(
    supplied: Option<&Map<String, Value>>,
    subject: &EntityMention,
    object: &EntityMention,
    text: &str,
) -> Option<Map<String, Value>> {
    if let Some(map) = supplied {
        if map.contains_key("span") && map.contains_key("snippet") {
            return Some(map.clone());
        }
    }

    let mut evidence = supplied.cloned().unwrap_or_default();

    let (subject_span, object_span) = (subject.span(), object.span());
    let (Some((subject_start, subject_end)), Some((object_start, object_end))) =
        (subject_span, object_span)
    else {
        if supplied.is_none() && subject_span.is_none() && object_span.is_none() {
            return None;
        }
        return Some(evidence);
    };

    let span_start = subject_start.min(object_start);
    let span_end = subject_end.max(object_end);

    evidence
        .entry("span")
        .or_insert_with(|| json!([span_start, span_end]));
    evidence
        .entry("snippet")
        .or_insert_with(|| Value::String(char_slice(text, span_start, span_end)));

    Some(evidence)
}

/// Slice by character offsets, clamping to the text bounds
fn char_slice(text: &str, start: usize, end: usize) -> String {
    text.chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect()
}

// ============================================================================
// Relation normalizer
// ============================================================================

/// Converts raw backend relation output into validated `RelationMention`
/// records, preserving input order. Items are processed independently;
/// one malformed item never affects its siblings.
pub struct RelationNormalizer {
    ids: Box<dyn IdSource>,
}

impl Default for RelationNormalizer {
    fn default() -> Self {
        Self::new(Box::new(UuidIds))
    }
}

impl RelationNormalizer {
    pub fn new(ids: Box<dyn IdSource>) -> Self {
        Self { ids }
    }

    /// Normalize one backend payload against the mentions it refers to.
    ///
    /// `text` must be the exact segment the entity offsets index into.
    pub fn normalize(
        &self,
        raw: &Value,
        entities: &[EntityMention],
        text: &str,
    ) -> Vec<RelationMention> {
        unwrap_items(raw)
            .iter()
            .filter_map(|item| self.normalize_item(item, entities, text))
            .collect()
    }

    fn normalize_item(
        &self,
        item: &Value,
        entities: &[EntityMention],
        text: &str,
    ) -> Option<RelationMention> {
        let (kind, score, head, tail, evidence) = match RawRelationItem::from_value(item)? {
            RawRelationItem::Positional {
                head,
                tail,
                kind,
                score,
            } => (Some(kind), score, Some(head), Some(tail), None),
            RawRelationItem::Record {
                kind,
                score,
                head,
                tail,
                evidence,
            } => (kind, score, head, tail, evidence),
        };

        let relation_type = stringify_type(kind?)?;
        let subject_id = resolve_endpoint(head?, entities)?;
        let object_id = resolve_endpoint(tail?, entities)?;
        let confidence = coerce_score(score);

        let supplied = evidence.and_then(Value::as_object);
        let subject = entities.iter().find(|e| e.id == subject_id);
        let object = entities.iter().find(|e| e.id == object_id);
        let evidence = match (subject, object) {
            (Some(subject), Some(object)) => synthesize_evidence(supplied, subject, object, text),
            // Verbatim descriptor ids can point outside the sequence; there
            // is nothing to anchor a derived span on then.
            _ => supplied.cloned(),
        }
        .unwrap_or_default();

        Some(RelationMention {
            id: self.ids.new_id("rel"),
            relation_type,
            confidence,
            subject: RelationEndpoint::new(subject_id),
            object: RelationEndpoint::new(object_id),
            evidence,
        })
    }
}

/// Unwrap the overall backend payload into a sequence of candidate items.
///
/// Mapping output is unwrapped via `relations`, then `predictions`;
/// anything that is not a sequence after unwrapping yields nothing.
fn unwrap_items(raw: &Value) -> &[Value] {
    let unwrapped = match raw {
        Value::Object(map) => map.get("relations").or_else(|| map.get("predictions")),
        other => Some(other),
    };
    unwrapped
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

/// The relation type, stringified; empty or absent types are rejected
fn stringify_type(value: &Value) -> Option<String> {
    let kind = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!kind.is_empty()).then_some(kind)
}

/// Best-effort score coercion; anything uncoercible becomes `None`
fn coerce_score(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
