use serde::{Deserialize, Serialize};

/// Paginated list envelope, e.g. `{"count": 3, "next": null, "results": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// A list response, either a bare JSON array or a paginated envelope.
///
/// Both shapes flatten to the items in server order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Items(Vec<T>),
    Page(Paginated<T>),
}

impl<T> Listing<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            Listing::Items(items) => items,
            Listing::Page(page) => page.results,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Listing::Items(items) => items.len(),
            Listing::Page(page) => page.results.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// URL of the next page, if the server announced one
    pub fn next_page(&self) -> Option<&str> {
        match self {
            Listing::Items(_) => None,
            Listing::Page(page) => page.next.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Game {
        id: u64,
        name: String,
    }

    #[test]
    fn test_bare_array() {
        let listing: Listing<Game> = serde_json::from_value(json!([
            {"id": 1, "name": "Celeste"},
            {"id": 2, "name": "Hades"}
        ]))
        .unwrap();

        assert_eq!(listing.len(), 2);
        assert_eq!(listing.next_page(), None);
        let names: Vec<_> = listing.into_items().into_iter().map(|g| g.name).collect();
        assert_eq!(names, vec!["Celeste", "Hades"]);
    }

    #[test]
    fn test_paginated_envelope_keeps_order() {
        let listing: Listing<Game> = serde_json::from_value(json!({
            "count": 40,
            "next": "https://api.example.com/games?page=2",
            "results": [
                {"id": 9, "name": "Outer Wilds"},
                {"id": 4, "name": "Tunic"},
                {"id": 7, "name": "Inside"}
            ]
        }))
        .unwrap();

        assert_eq!(listing.next_page(), Some("https://api.example.com/games?page=2"));
        let ids: Vec<_> = listing.into_items().into_iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![9, 4, 7]);
    }

    #[test]
    fn test_wrong_shape_is_rejected() {
        let result: Result<Listing<Game>, _> = serde_json::from_value(json!({"items": []}));
        assert!(result.is_err());
    }
}
