//! Filter / sort / paginate pipeline for the listing endpoint.

use serde::{Deserialize, Serialize};

use crate::book::Book;
use crate::error::ValidationError;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Listing parameters as they arrive in the query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

fn default_page() -> u32 {
    DEFAULT_PAGE
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            sort_by: None,
            genre: None,
            author: None,
        }
    }
}

/// Sortable columns. Unknown names leave the store order untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Title,
    Author,
    PublicationYear,
}

impl SortKey {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "title" => Some(SortKey::Title),
            "author" => Some(SortKey::Author),
            "publication_year" => Some(SortKey::PublicationYear),
            _ => None,
        }
    }
}

/// One page of listing results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookPage {
    pub books: Vec<Book>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
    pub pages: usize,
}

impl ListQuery {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.page < 1 {
            return Err(ValidationError::Page(self.page));
        }
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(ValidationError::Limit {
                limit: self.limit,
                max: MAX_LIMIT,
            });
        }
        Ok(())
    }

    /// Run the pipeline over a snapshot of the collection.
    pub fn apply(&self, mut books: Vec<Book>) -> Result<BookPage, ValidationError> {
        self.validate()?;

        if let Some(genre) = non_empty(&self.genre) {
            let genre = genre.to_lowercase();
            books.retain(|b| b.genre.to_lowercase() == genre);
        }
        if let Some(author) = non_empty(&self.author) {
            let author = author.to_lowercase();
            books.retain(|b| b.author.to_lowercase() == author);
        }

        // sort_by_cached_key is stable, so ties keep store order
        match self.sort_by.as_deref().and_then(SortKey::parse) {
            Some(SortKey::Title) => books.sort_by_cached_key(|b| b.title.to_lowercase()),
            Some(SortKey::Author) => books.sort_by_cached_key(|b| b.author.to_lowercase()),
            Some(SortKey::PublicationYear) => books.sort_by_key(|b| b.publication_year),
            None => {}
        }

        let total = books.len();
        let limit = self.limit as usize;
        let start = (self.page as usize - 1).saturating_mul(limit);
        let page_books: Vec<Book> = books.into_iter().skip(start).take(limit).collect();

        Ok(BookPage {
            books: page_books,
            total,
            page: self.page,
            limit: self.limit,
            pages: total.div_ceil(limit),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: u64, title: &str, author: &str, year: i32, genre: &str) -> Book {
        Book {
            id,
            title: title.into(),
            author: author.into(),
            publication_year: year,
            genre: genre.into(),
            isbn: format!("{:010}", id),
        }
    }

    fn sample() -> Vec<Book> {
        vec![
            book(1, "dracula", "Bram Stoker", 1897, "Horror"),
            book(2, "Beloved", "Toni Morrison", 1987, "Fiction"),
            book(3, "Carrie", "Stephen King", 1974, "horror"),
            book(4, "Atonement", "Ian McEwan", 2001, "fiction"),
        ]
    }

    fn query() -> ListQuery {
        ListQuery::default()
    }

    #[test]
    fn test_defaults_return_store_order() {
        let page = query().apply(sample()).unwrap();
        let ids: Vec<u64> = page.books.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!((page.total, page.page, page.limit, page.pages), (4, 1, 10, 1));
    }

    #[test]
    fn test_genre_filter_case_insensitive() {
        let q = ListQuery {
            genre: Some("Fiction".into()),
            ..query()
        };
        let page = q.apply(sample()).unwrap();
        assert_eq!(page.total, 2);
        assert!(page.books.iter().all(|b| b.genre.eq_ignore_ascii_case("fiction")));
    }

    #[test]
    fn test_author_filter_exact_match() {
        let q = ListQuery {
            author: Some("stephen king".into()),
            ..query()
        };
        let page = q.apply(sample()).unwrap();
        assert_eq!(page.books.len(), 1);
        assert_eq!(page.books[0].id, 3);

        let partial = ListQuery {
            author: Some("King".into()),
            ..query()
        };
        assert_eq!(partial.apply(sample()).unwrap().total, 0);
    }

    #[test]
    fn test_empty_filter_ignored() {
        let q = ListQuery {
            genre: Some(String::new()),
            ..query()
        };
        assert_eq!(q.apply(sample()).unwrap().total, 4);
    }

    #[test]
    fn test_sort_by_title_ignores_case() {
        let q = ListQuery {
            sort_by: Some("title".into()),
            ..query()
        };
        let titles: Vec<String> = q
            .apply(sample())
            .unwrap()
            .books
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, vec!["Atonement", "Beloved", "Carrie", "dracula"]);
    }

    #[test]
    fn test_sort_by_year_non_decreasing() {
        let q = ListQuery {
            sort_by: Some("publication_year".into()),
            ..query()
        };
        let years: Vec<i32> = q
            .apply(sample())
            .unwrap()
            .books
            .iter()
            .map(|b| b.publication_year)
            .collect();
        assert!(years.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(years.first(), Some(&1897));
    }

    #[test]
    fn test_unknown_sort_keeps_order() {
        let q = ListQuery {
            sort_by: Some("isbn".into()),
            ..query()
        };
        let ids: Vec<u64> = q.apply(sample()).unwrap().books.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_pagination_second_page() {
        let books: Vec<Book> = (1..=25).map(|i| book(i, "T", "A", 2000, "G")).collect();
        let q = ListQuery {
            page: 2,
            limit: 10,
            ..query()
        };
        let page = q.apply(books).unwrap();
        let ids: Vec<u64> = page.books.iter().map(|b| b.id).collect();
        assert_eq!(ids, (11..=20).collect::<Vec<u64>>());
        assert_eq!(page.pages, 3);
        assert_eq!(page.total, 25);
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let q = ListQuery {
            page: 9,
            ..query()
        };
        let page = q.apply(sample()).unwrap();
        assert!(page.books.is_empty());
        assert_eq!(page.total, 4);
    }

    #[test]
    fn test_empty_collection_has_zero_pages() {
        let page = query().apply(Vec::new()).unwrap();
        assert_eq!(page.pages, 0);
        assert_eq!(page.total, 0);
    }

    #[test]
    fn test_bounds_rejected() {
        let zero_page = ListQuery { page: 0, ..query() };
        assert_eq!(zero_page.apply(sample()).unwrap_err(), ValidationError::Page(0));

        let big = ListQuery { limit: 101, ..query() };
        assert!(big.apply(sample()).is_err());
        let zero = ListQuery { limit: 0, ..query() };
        assert!(zero.validate().is_err());
        let max = ListQuery { limit: 100, ..query() };
        assert!(max.validate().is_ok());
    }
}
