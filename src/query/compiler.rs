use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use super::{FilterOperator, FilterSpec, QueryOptions, QuerySpec, SortSpec, SortSpecifier};
use crate::error::BindingError;
use crate::path::PathComponents;

/// Output of a compilation step plus whatever had to be skipped to get it.
///
/// Compilation never aborts on a bad filter or sorter: the offending entry
/// is dropped, recorded here, and the rest of the batch still compiles.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled<T> {
    pub value: T,
    pub diagnostics: Vec<BindingError>,
}

impl<T> Compiled<T> {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

#[derive(Default)]
struct PropertyFragments {
    alternatives: Vec<Value>,
    bounds: Vec<Value>,
}

fn field(path: &str, expression: Value) -> Value {
    let mut map = Map::new();
    map.insert(path.to_string(), expression);
    Value::Object(map)
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn pattern(expression: String) -> Value {
    json!({ "$regex": expression, "$options": "i" })
}

fn fragment(filter: &FilterSpec) -> Result<Value, BindingError> {
    let v1 = &filter.value1;
    Ok(match &filter.operator {
        FilterOperator::BT => json!({
            "$gte": v1,
            "$lte": filter.value2.clone().unwrap_or(Value::Null),
        }),
        FilterOperator::Contains => pattern(regex::escape(&text(v1))),
        FilterOperator::StartsWith => pattern(format!("^{}", regex::escape(&text(v1)))),
        FilterOperator::EndsWith => pattern(format!("{}$", regex::escape(&text(v1)))),
        FilterOperator::EQ => v1.clone(),
        FilterOperator::GE => json!({ "$gte": v1 }),
        FilterOperator::GT => json!({ "$gt": v1 }),
        FilterOperator::LE => json!({ "$lte": v1 }),
        FilterOperator::LT => json!({ "$lt": v1 }),
        FilterOperator::NE => json!({ "$ne": v1 }),
        FilterOperator::Other(name) => {
            return Err(BindingError::UnsupportedFilterOperator {
                path: filter.property_path.clone(),
                operator: name.clone(),
            })
        }
    })
}

/// Compile filters into a selector.
///
/// Filters are grouped by property in the order the properties first
/// appear. Alternatives on one property (`EQ`, `Contains`, `StartsWith`,
/// `EndsWith`) are OR'd into a single clause; range and exclusion filters
/// (`GT`, `GE`, `LT`, `LE`, `BT`, `NE`) each stay a clause of their own.
/// Clauses are AND'd, and a lone clause is returned without the `$and`.
pub fn compile_selector(filters: &[FilterSpec]) -> Compiled<Value> {
    let mut diagnostics = Vec::new();
    let mut properties: IndexMap<&str, PropertyFragments> = IndexMap::new();

    for filter in filters {
        if filter.multi {
            diagnostics.push(BindingError::MultiFilterUnsupported {
                path: filter.property_path.clone(),
            });
            continue;
        }

        let expression = match fragment(filter) {
            Ok(expression) => expression,
            Err(err) => {
                diagnostics.push(err);
                continue;
            }
        };

        let fragments = properties.entry(filter.property_path.as_str()).or_default();
        if filter.operator.is_alternative() {
            fragments.alternatives.push(expression);
        } else {
            fragments.bounds.push(expression);
        }
    }

    let mut clauses = Vec::new();
    for (path, fragments) in properties {
        let mut alternatives = fragments.alternatives;
        match alternatives.len() {
            0 => {}
            1 => clauses.push(field(path, alternatives.remove(0))),
            _ => clauses.push(json!({
                "$or": alternatives
                    .into_iter()
                    .map(|expression| field(path, expression))
                    .collect::<Vec<_>>()
            })),
        }
        clauses.extend(fragments.bounds.into_iter().map(|bound| field(path, bound)));
    }

    let value = match clauses.len() {
        0 => json!({}),
        1 => clauses.remove(0),
        _ => json!({ "$and": clauses }),
    };

    Compiled { value, diagnostics }
}

/// Compile sorters into a sort specifier. Only top-level properties can be
/// sorted on, and only by the store's natural ordering.
pub fn compile_sort(sorters: &[SortSpec]) -> Compiled<SortSpecifier> {
    let mut diagnostics = Vec::new();
    let mut specifier = SortSpecifier::new();

    for sorter in sorters {
        if sorter.property_path.contains('/') || sorter.property_path.contains('.') {
            diagnostics.push(BindingError::UnsupportedSortPath {
                path: sorter.property_path.clone(),
            });
            continue;
        }
        if sorter.comparator.is_some() {
            diagnostics.push(BindingError::CustomComparatorUnsupported {
                path: sorter.property_path.clone(),
            });
            continue;
        }
        specifier.push(sorter.property_path.clone(), sorter.descending);
    }

    Compiled {
        value: specifier,
        diagnostics,
    }
}

/// Build the query for a resolved path.
///
/// A path naming a document selects it by `_id` and ignores filters.
pub fn compile_query(
    components: &PathComponents,
    sorters: &[SortSpec],
    filters: &[FilterSpec],
    size_limit: usize,
) -> Compiled<QuerySpec> {
    let mut diagnostics = Vec::new();

    let selector = match &components.document_id {
        Some(id) => json!({ "_id": id.to_value() }),
        None if filters.is_empty() => json!({}),
        None => {
            let compiled = compile_selector(filters);
            diagnostics.extend(compiled.diagnostics);
            compiled.value
        }
    };

    let sort = if sorters.is_empty() {
        None
    } else {
        let compiled = compile_sort(sorters);
        diagnostics.extend(compiled.diagnostics);
        Some(compiled.value)
    };

    Compiled {
        value: QuerySpec {
            selector,
            options: QueryOptions {
                limit: size_limit,
                sort,
            },
        },
        diagnostics,
    }
}
