use serde_json::Value;

/// Follow a dotted path such as `items.0.sellers.-1.price`.
///
/// Numeric segments index arrays; negative ones count from the end.
/// An empty path returns `value` itself.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;

    for part in path.split('.').filter(|p| !p.is_empty()) {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => {
                let index: i64 = part.parse().ok()?;
                let resolved = if index < 0 {
                    items.len().checked_sub(index.unsigned_abs() as usize)?
                } else {
                    index as usize
                };
                items.get(resolved)?
            }
            _ => return None,
        };
    }

    Some(current)
}
