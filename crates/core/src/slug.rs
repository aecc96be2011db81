/// URL slug for a display name: lowercase ASCII words joined by `-`.
///
/// `"The Forest Hiker!"` becomes `"the-forest-hiker"`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_separators_and_drops_punctuation() {
        assert_eq!(slugify("The Forest Hiker!"), "the-forest-hiker");
        assert_eq!(slugify("  Sea -- Explorer "), "sea-explorer");
        assert_eq!(slugify("Room #12"), "room-12");
    }

    #[test]
    fn empty_name_gives_empty_slug() {
        assert_eq!(slugify("!!!"), "");
    }
}
