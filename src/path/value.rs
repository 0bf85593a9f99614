use serde_json::Value;

/// Walk a `.`/`[idx]` property path into a document.
///
/// `items[2].name` and `items.2.name` are equivalent. An empty path yields
/// the document itself.
pub fn value_at<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let normalized = path.replace('[', ".").replace(']', "");
    normalized
        .split('.')
        .filter(|step| !step.is_empty())
        .try_fold(document, |current, step| match current {
            Value::Object(map) => map.get(step),
            Value::Array(items) => step.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}
