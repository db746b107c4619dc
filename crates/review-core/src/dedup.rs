use review_models::CanonicalReview;
use std::collections::HashSet;

/// Identity used to detect the same review arriving twice
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Id(String),
    /// Used when the source gave no stable identifier
    Composite {
        user_name: String,
        date: Option<String>,
        text_prefix: String,
    },
}

impl DedupKey {
    pub fn of(review: &CanonicalReview, prefix_len: usize) -> Self {
        match review.review_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => DedupKey::Id(id.to_string()),
            None => DedupKey::Composite {
                user_name: review.user_name.trim().to_string(),
                date: review.date.clone(),
                text_prefix: review.text_prefix(prefix_len),
            },
        }
    }
}

/// Identity set owned by one collection run
#[derive(Debug)]
pub struct DedupSet {
    seen: HashSet<DedupKey>,
    prefix_len: usize,
    dropped: usize,
}

impl DedupSet {
    pub fn new(prefix_len: usize) -> Self {
        Self {
            seen: HashSet::new(),
            prefix_len,
            dropped: 0,
        }
    }

    /// Returns false (and counts a drop) when the identity was already seen
    pub fn insert(&mut self, review: &CanonicalReview) -> bool {
        if self.seen.insert(DedupKey::of(review, self.prefix_len)) {
            true
        } else {
            self.dropped += 1;
            false
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(id: Option<&str>, user: &str, date: Option<&str>, text: &str) -> CanonicalReview {
        CanonicalReview {
            review_id: id.map(str::to_string),
            user_name: user.to_string(),
            date: date.map(str::to_string),
            text: text.to_string(),
            ..CanonicalReview::default()
        }
    }

    fn unique(reviews: Vec<CanonicalReview>, prefix_len: usize) -> Vec<CanonicalReview> {
        let mut set = DedupSet::new(prefix_len);
        reviews.into_iter().filter(|review| set.insert(review)).collect()
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let reviews = vec![
            review(Some("1"), "a", None, "first"),
            review(Some("2"), "b", None, "second"),
            review(Some("1"), "c", None, "copy"),
        ];
        let unique = unique(reviews, 120);

        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].text, "first");
        assert_eq!(unique[1].text, "second");
    }

    #[test]
    fn test_composite_key_for_missing_ids() {
        let long_text = "x".repeat(200);
        let mut variant = long_text.clone();
        variant.push_str(" edited tail");

        let reviews = vec![
            review(None, "Anna", Some("2024-01-01T00:00:00"), &long_text),
            // Differs only after the prefix: same identity
            review(None, "Anna", Some("2024-01-01T00:00:00"), &variant),
            review(None, "Anna", Some("2024-01-02T00:00:00"), &long_text),
            review(None, "Boris", Some("2024-01-01T00:00:00"), &long_text),
        ];

        assert_eq!(unique(reviews, 120).len(), 3);
    }

    #[test]
    fn test_id_and_composite_do_not_collide() {
        let mut set = DedupSet::new(10);
        assert!(set.insert(&review(Some("1"), "Anna", None, "text")));
        assert!(set.insert(&review(None, "Anna", None, "text")));
        assert!(!set.insert(&review(None, "Anna", None, "text")));
        assert_eq!(set.len(), 2);
        assert_eq!(set.dropped(), 1);
    }

    #[test]
    fn test_blank_id_uses_composite() {
        let key = DedupKey::of(&review(Some("  "), "Anna", None, "hello"), 3);
        assert_eq!(
            key,
            DedupKey::Composite {
                user_name: "Anna".to_string(),
                date: None,
                text_prefix: "hel".to_string(),
            }
        );
    }
}
