//! Slug generation
//!
//! Slugs are lowercase ASCII with runs of anything else collapsed into a
//! single `-`. Uniqueness is enforced by an explicit lookup: on collision the
//! slug of the category being written gets its own id appended.

use crate::db::CategoryStore;
use crate::error::{TreeError, TreeResult};

/// Used when a name has no ASCII alphanumerics at all
const FALLBACK_SLUG: &str = "category";

pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

pub fn with_id_suffix(slug: &str, id: i64) -> String {
    format!("{slug}-{id}")
}

/// Slug for `name` that no category other than `own_id` holds
pub async fn unique_slug(store: &dyn CategoryStore, name: &str, own_id: i64) -> TreeResult<String> {
    let base = slugify(name);
    match store.find_by_slug(&base).await? {
        Some(existing) if existing.id != own_id => {}
        _ => return Ok(base),
    }

    let suffixed = with_id_suffix(&base, own_id);
    match store.find_by_slug(&suffixed).await? {
        Some(existing) if existing.id != own_id => Err(TreeError::Validation(format!(
            "slug '{suffixed}' is still taken by category {} after disambiguation",
            existing.id
        ))),
        _ => Ok(suffixed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Electronics"), "electronics");
        assert_eq!(slugify("Home & Garden"), "home-garden");
        assert_eq!(slugify("  Men's   T-Shirts!! "), "men-s-t-shirts");
        assert_eq!(slugify("4K TVs"), "4k-tvs");
        assert_eq!(slugify("Café Crème"), "caf-cr-me");
        assert_eq!(slugify("家电"), "category");
        assert_eq!(slugify("--"), "category");
    }

    #[test]
    fn test_with_id_suffix() {
        assert_eq!(with_id_suffix("home-garden", 17), "home-garden-17");
    }
}
