/// Normalized lookup key: lowercase with `_` replaced by `-`.
///
/// Applied to enum, entry, message and field names, never to base-type names.
pub(crate) fn key(name: &str) -> String {
    name.to_lowercase().replace('_', "-")
}

/// Split an array suffix off a field type: `"float[4]"` becomes
/// `("float", Some(4))`, `"uint8_t"` becomes `("uint8_t", None)`.
/// Returns `None` when the bracket syntax is malformed.
pub(crate) fn split_array_suffix(type_text: &str) -> Option<(&str, Option<usize>)> {
    match type_text.find('[') {
        None => Some((type_text, None)),
        Some(start) if type_text.ends_with(']') => {
            let len = type_text[start + 1..type_text.len() - 1].parse().ok()?;
            Some((&type_text[..start], Some(len)))
        }
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_lowercased_and_dashed() {
        assert_eq!(key("MAV_MODE_FLAG"), "mav-mode-flag");
        assert_eq!(key("Heartbeat"), "heartbeat");
    }

    #[test]
    fn array_suffix_is_split_off() {
        assert_eq!(split_array_suffix("float[4]"), Some(("float", Some(4))));
        assert_eq!(split_array_suffix("uint8_t"), Some(("uint8_t", None)));
        assert_eq!(split_array_suffix("char[x]"), None);
        assert_eq!(split_array_suffix("char[3"), None);
    }
}
