//! Server id mapping and payload rewrite
//!
//! After a queued create is delivered, the backend answers with the
//! server-assigned keys for the parent order and any child lines. The
//! [`IdMapping`] carries those pairs; the store applies them to the record
//! tables and uses [`IdMapping::rewrite`] to fix up still-queued payloads
//! that reference a temporary id.
//!
//! Rewriting is structural, not textual: the payload is walked as a JSON
//! tree and only string leaves exactly equal to a mapped local id are
//! replaced. A quantity that happens to share digits with an id, or an id
//! embedded inside a longer string, is never touched.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::newtypes::RecordId;
use super::reference::string_or_number;

fn record_id<'de, D>(deserializer: D) -> Result<RecordId, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = string_or_number(deserializer)?;
    RecordId::new(raw).map_err(serde::de::Error::custom)
}

/// One local→server id correspondence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdPair {
    /// Client-generated temporary id
    #[serde(deserialize_with = "record_id")]
    pub local_id: RecordId,
    /// Server-assigned key (the backend may send it as a bare number)
    #[serde(deserialize_with = "record_id")]
    pub remote_id: RecordId,
}

/// Id mapping extracted from a successful delivery response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdMapping {
    #[serde(deserialize_with = "record_id")]
    local_os_id: RecordId,
    #[serde(deserialize_with = "record_id")]
    remote_os_id: RecordId,
    #[serde(default)]
    pecas_ids: Vec<IdPair>,
    #[serde(default)]
    servicos_ids: Vec<IdPair>,
    #[serde(default)]
    horas_ids: Vec<IdPair>,
}

impl IdMapping {
    /// Extract a mapping from a delivery response body
    ///
    /// Returns `None` unless both `local_os_id` and `remote_os_id` are
    /// present and non-null; the shape's absence means "nothing to remap,
    /// just drop the queue entry".
    #[must_use]
    pub fn from_response(response: &Value) -> Option<Self> {
        let has_parent_ids = response.get("local_os_id").is_some_and(|v| !v.is_null())
            && response.get("remote_os_id").is_some_and(|v| !v.is_null());
        if !has_parent_ids {
            return None;
        }
        serde_json::from_value(response.clone()).ok()
    }

    /// Temporary id the order was enqueued under
    #[must_use]
    pub fn local_order_id(&self) -> &RecordId {
        &self.local_os_id
    }

    /// Server key assigned to the order
    #[must_use]
    pub fn remote_order_id(&self) -> &RecordId {
        &self.remote_os_id
    }

    /// Part-line id pairs
    #[must_use]
    pub fn parts(&self) -> &[IdPair] {
        &self.pecas_ids
    }

    /// Service-line id pairs
    #[must_use]
    pub fn services(&self) -> &[IdPair] {
        &self.servicos_ids
    }

    /// Labor-line id pairs
    #[must_use]
    pub fn hours(&self) -> &[IdPair] {
        &self.horas_ids
    }

    /// All pairs, parent first
    pub fn pairs(&self) -> impl Iterator<Item = (&RecordId, &RecordId)> {
        std::iter::once((&self.local_os_id, &self.remote_os_id)).chain(
            self.pecas_ids
                .iter()
                .chain(&self.servicos_ids)
                .chain(&self.horas_ids)
                .map(|pair| (&pair.local_id, &pair.remote_id)),
        )
    }

    /// Rewrite every reference to a mapped local id inside `payload`
    ///
    /// Returns the updated document when at least one leaf changed, `None`
    /// when the payload does not reference any mapped id.
    #[must_use]
    pub fn rewrite(&self, payload: &Value) -> Option<Value> {
        let replacements: HashMap<&str, &RecordId> = self
            .pairs()
            .map(|(local, remote)| (local.as_str(), remote))
            .collect();

        let mut updated = payload.clone();
        let changed = rewrite_node(&mut updated, &replacements);
        (changed > 0).then_some(updated)
    }
}

/// Replace string leaves equal to a mapped local id; returns how many changed
fn rewrite_node(node: &mut Value, replacements: &HashMap<&str, &RecordId>) -> usize {
    match node {
        Value::String(text) => match replacements.get(text.as_str()) {
            Some(remote) => {
                *text = remote.as_str().to_string();
                1
            }
            None => 0,
        },
        Value::Array(items) => items
            .iter_mut()
            .map(|item| rewrite_node(item, replacements))
            .sum(),
        Value::Object(fields) => fields
            .values_mut()
            .map(|value| rewrite_node(value, replacements))
            .sum(),
        _ => 0,
    }
}

/// Counters produced by one remap transaction, for logging only
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapReport {
    /// Whether the parent order row was found and updated
    pub parent_remapped: bool,
    /// Child rows found and updated
    pub children_remapped: usize,
    /// Mapped ids whose local record no longer exists
    pub lookups_missed: usize,
    /// Other queued payloads rewritten to reference server ids
    pub payloads_rewritten: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mapped_response() -> Value {
        json!({
            "local_os_id": "LOCAL-A",
            "remote_os_id": 9001,
            "pecas_ids": [{"local_id": "LOCAL-P1", "remote_id": "501"}],
            "servicos_ids": [],
            "horas_ids": [{"local_id": "LOCAL-H1", "remote_id": 601}]
        })
    }

    #[test]
    fn test_from_response_requires_both_parent_ids() {
        assert!(IdMapping::from_response(&json!({"status": "ok"})).is_none());
        assert!(IdMapping::from_response(&json!({"local_os_id": "LOCAL-A"})).is_none());
        assert!(
            IdMapping::from_response(&json!({"local_os_id": "LOCAL-A", "remote_os_id": null}))
                .is_none()
        );
    }

    #[test]
    fn test_from_response_parses_full_shape() {
        let mapping = IdMapping::from_response(&mapped_response()).unwrap();
        assert_eq!(mapping.local_order_id().as_str(), "LOCAL-A");
        assert_eq!(mapping.remote_order_id().as_str(), "9001");
        assert_eq!(mapping.parts().len(), 1);
        assert_eq!(mapping.services().len(), 0);
        assert_eq!(mapping.hours()[0].remote_id.as_str(), "601");
    }

    #[test]
    fn test_from_response_defaults_missing_child_arrays() {
        let mapping = IdMapping::from_response(&json!({
            "local_os_id": "LOCAL-A",
            "remote_os_id": "9001"
        }))
        .unwrap();
        assert!(mapping.parts().is_empty());
        assert_eq!(mapping.pairs().count(), 1);
    }

    #[test]
    fn test_rewrite_replaces_exact_string_leaves() {
        let mapping = IdMapping::from_response(&mapped_response()).unwrap();
        let payload = json!({
            "peca_os": "LOCAL-A",
            "itens": [{"ref": "LOCAL-P1"}, {"ref": "other"}]
        });
        let updated = mapping.rewrite(&payload).unwrap();
        assert_eq!(updated["peca_os"], "9001");
        assert_eq!(updated["itens"][0]["ref"], "501");
        assert_eq!(updated["itens"][1]["ref"], "other");
    }

    #[test]
    fn test_rewrite_ignores_numbers_and_substrings() {
        let mapping = IdMapping::from_response(&json!({
            "local_os_id": "42",
            "remote_os_id": "9001"
        }))
        .unwrap();
        let payload = json!({
            "quantidade": 42,
            "observacao": "item 42 em falta"
        });
        assert!(mapping.rewrite(&payload).is_none());
    }

    #[test]
    fn test_rewrite_returns_none_when_untouched() {
        let mapping = IdMapping::from_response(&mapped_response()).unwrap();
        let payload = json!({"os_os": "SOMETHING-ELSE"});
        assert!(mapping.rewrite(&payload).is_none());
    }

    #[test]
    fn test_rewrite_child_create_payload() {
        let mapping = IdMapping::from_response(&json!({
            "local_os_id": "LOCAL-A",
            "remote_os_id": "9001"
        }))
        .unwrap();
        let child_payload = json!({"peca_os": "LOCAL-A", "peca_prod": "P-10"});
        let updated = mapping.rewrite(&child_payload).unwrap();
        let text = updated.to_string();
        assert!(text.contains("9001"));
        assert!(!text.contains("LOCAL-A"));
    }
}
