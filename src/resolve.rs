use serde_json::Value;

/// Resolves a dotted key path against a nested JSON value.
///
/// Splits the path on `.` and descends one object level per segment.
/// Resolution stops with `None` the first time a segment is missing or the
/// current value is not an object. An empty path resolves to the container
/// itself, which lets a source declare its list at the top level of the
/// response body.
pub fn resolve<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        if segment.is_empty() {
            continue;
        }
        match current {
            Value::Object(map) => current = map.get(segment)?,
            _ => return None,
        }
    }
    Some(current)
}
