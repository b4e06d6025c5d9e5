// Copyright (c) 2021 DDN. All rights reserved.
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file.

//! Response-tree flattening: each ONTAPI response subtree becomes the
//! nested mapping shape the facts consumer sees.

use ontap_tracing::tracing;
use ontapi_client::resp::Element;
use serde_json::{Map, Value};

/// Convert a response subtree into a value.
///
/// A leaf becomes its text, or null when empty. An inner node becomes a
/// mapping of its immediate child names; repeated sibling names coalesce
/// into an array, so a field holds a single mapping for one record and an
/// array for several. Leaf text is exposed verbatim, with no numeric or
/// boolean coercion. ONTAPI never produces mixed content, so text on a
/// node that also has element children is dropped.
pub fn tree_to_value(el: &Element) -> Value {
    if el.children_get().is_empty() {
        return match el.text() {
            "" => Value::Null,
            x => Value::String(x.to_string()),
        };
    }

    let mut m = Map::new();

    for child in el.children_get() {
        let v = tree_to_value(child);

        match m.get_mut(child.name()) {
            None => {
                m.insert(child.name().to_string(), v);
            }
            Some(Value::Array(xs)) => {
                xs.push(v);
            }
            Some(x) => {
                let first = x.take();

                *x = Value::Array(vec![first, v]);
            }
        }
    }

    Value::Object(m)
}

fn scalar(el: &Element, name: &str) -> Value {
    el.child_get_string(name)
        .map(|x| Value::String(x.to_string()))
        .unwrap_or(Value::Null)
}

/// The `system-get-version` fact group: three named scalars plus the
/// converted `version-tuple` subtree.
pub fn version_info(results: &Element) -> Value {
    let mut m = Map::new();

    m.insert("build_timestamp".to_string(), scalar(results, "build-timestamp"));
    m.insert("is_clustered".to_string(), scalar(results, "is-clustered"));
    m.insert("version".to_string(), scalar(results, "version"));
    m.insert(
        "version_tuple".to_string(),
        results
            .child_get("version-tuple")
            .map(tree_to_value)
            .unwrap_or(Value::Null),
    );

    Value::Object(m)
}

/// One entry per record of a list response, keyed by the record's name
/// field. Duplicate names overwrite, last wins. A missing or empty
/// container yields an empty mapping, not an error.
pub fn keyed_records(results: &Element, container: &str, key_field: &str) -> Value {
    let mut m = Map::new();

    let records = results
        .child_get(container)
        .map(|x| x.children_get())
        .unwrap_or(&[]);

    for record in records {
        let name = match record.child_get_string(key_field) {
            Some(x) => x,
            None => {
                tracing::warn!(
                    "Skipping a {} record with no {} field",
                    record.name(),
                    key_field
                );

                continue;
            }
        };

        m.insert(name.to_string(), tree_to_value(record));
    }

    Value::Object(m)
}
