//! Offset-based pagination over list endpoints.
//!
//! # Design
//! `Paginated` wraps a single-page fetch (`cursor -> Envelope`) and is itself
//! only a description of the traversal. Every call to [`Paginated::iter`]
//! starts over from cursor 0, so the same value can be walked repeatedly.
//! Pages are pulled on demand: nothing is fetched until the iterator is
//! polled, and the next page is requested only once the buffered items of the
//! current one are drained.

use std::collections::VecDeque;

use serde_json::Value;

use crate::envelope::Envelope;
use crate::error::Error;

/// One element produced by a paginated traversal.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// A record from a page's `data`.
    Item(Value),
    /// An unsuccessful page. Always the last element of its traversal.
    Failure(Envelope),
}

impl Entry {
    pub fn item(&self) -> Option<&Value> {
        match self {
            Entry::Item(v) => Some(v),
            Entry::Failure(_) => None,
        }
    }

    pub fn into_item(self) -> Option<Value> {
        match self {
            Entry::Item(v) => Some(v),
            Entry::Failure(_) => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Entry::Failure(_))
    }
}

/// A restartable, lazily evaluated sequence of records.
pub struct Paginated<F> {
    fetch: F,
}

impl<F> Paginated<F>
where
    F: Fn(u64) -> Result<Envelope, Error>,
{
    pub fn new(fetch: F) -> Self {
        Self { fetch }
    }

    /// Start a fresh traversal at cursor 0.
    pub fn iter(&self) -> Pages<'_, F> {
        Pages {
            fetch: &self.fetch,
            cursor: Some(0),
            buffer: VecDeque::new(),
        }
    }

    /// Walk every entry, handing each one to `f`.
    ///
    /// Stops at the first transport or configuration error.
    pub fn each(&self, mut f: impl FnMut(Entry)) -> Result<(), Error> {
        for entry in self.iter() {
            f(entry?);
        }
        Ok(())
    }

    /// Collect a full traversal.
    pub fn all(&self) -> Result<Vec<Entry>, Error> {
        self.iter().collect()
    }
}

impl<'a, F> IntoIterator for &'a Paginated<F>
where
    F: Fn(u64) -> Result<Envelope, Error>,
{
    type Item = Result<Entry, Error>;
    type IntoIter = Pages<'a, F>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator state for one traversal of a [`Paginated`] sequence.
///
/// `cursor` is `None` once the last page has been requested.
pub struct Pages<'a, F> {
    fetch: &'a F,
    cursor: Option<u64>,
    buffer: VecDeque<Value>,
}

impl<F> Iterator for Pages<'_, F>
where
    F: Fn(u64) -> Result<Envelope, Error>,
{
    type Item = Result<Entry, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(item) = self.buffer.pop_front() {
            return Some(Ok(Entry::Item(item)));
        }

        let cursor = self.cursor.take()?;
        tracing::trace!(start = cursor, "fetching page");
        let envelope = match (self.fetch)(cursor) {
            Ok(envelope) => envelope,
            Err(e) => return Some(Err(e)),
        };

        if !envelope.is_success() {
            return Some(Ok(Entry::Failure(envelope)));
        }

        let items = match envelope.data() {
            None => return None,
            Some(Value::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
        };
        if items.is_empty() {
            return None;
        }

        if let Some(p) = envelope.pagination() {
            if p.more_items_in_collection {
                if p.next_start > cursor {
                    self.cursor = Some(p.next_start);
                } else {
                    tracing::warn!(
                        start = cursor,
                        next_start = p.next_start,
                        "page reports more items without advancing the cursor, stopping"
                    );
                }
            }
        }

        self.buffer = VecDeque::from(items);
        self.buffer.pop_front().map(|item| Ok(Entry::Item(item)))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::json;

    use super::*;
    use crate::envelope::normalize;
    use crate::error::TransportError;
    use crate::http::HttpResponse;

    fn page(status: u16, body: Value) -> Envelope {
        normalize(&HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        })
    }

    fn items(entries: Vec<Entry>) -> Vec<Value> {
        entries.into_iter().filter_map(Entry::into_item).collect()
    }

    #[test]
    fn follows_pagination_cursor() {
        let calls = RefCell::new(Vec::new());
        let pages = Paginated::new(|start| {
            calls.borrow_mut().push(start);
            Ok(match start {
                0 => page(
                    200,
                    json!({
                        "data": [1, 2],
                        "additional_data": {"pagination": {"more_items_in_collection": true, "next_start": 10}}
                    }),
                ),
                10 => page(200, json!({"data": [3, 4]})),
                other => panic!("unexpected cursor {other}"),
            })
        });

        assert_eq!(items(pages.all().unwrap()), vec![json!(1), json!(2), json!(3), json!(4)]);
        assert_eq!(*calls.borrow(), vec![0, 10]);
    }

    #[test]
    fn empty_data_yields_nothing() {
        let pages = Paginated::new(|_| {
            Ok(page(
                200,
                json!({"data": [], "additional_data": {"pagination": {"more_items_in_collection": true, "next_start": 5}}}),
            ))
        });
        assert!(pages.all().unwrap().is_empty());
    }

    #[test]
    fn missing_data_yields_nothing() {
        let pages = Paginated::new(|_| Ok(page(200, json!({}))));
        assert_eq!(pages.iter().count(), 0);
    }

    #[test]
    fn failed_page_is_yielded_as_sole_element() {
        let pages = Paginated::new(|_| Ok(page(401, json!({"error": "unauthorized"}))));
        let entries = pages.all().unwrap();
        assert_eq!(entries.len(), 1);
        match &entries[0] {
            Entry::Failure(env) => {
                assert!(!env.is_success());
                assert!(env.is_not_authorized());
            }
            Entry::Item(v) => panic!("expected failure, got item {v}"),
        }
    }

    #[test]
    fn failure_after_first_page_ends_traversal() {
        let pages = Paginated::new(|start| {
            Ok(if start == 0 {
                page(
                    200,
                    json!({"data": ["a"], "additional_data": {"pagination": {"more_items_in_collection": true, "next_start": 1}}}),
                )
            } else {
                page(500, json!({}))
            })
        });
        let entries = pages.all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], Entry::Item(json!("a")));
        assert!(entries[1].is_failure());
    }

    #[test]
    fn missing_pagination_fetches_one_page() {
        let calls = RefCell::new(0);
        let pages = Paginated::new(|_| {
            *calls.borrow_mut() += 1;
            Ok(page(200, json!({"data": [1, 2, 3]})))
        });
        assert_eq!(pages.all().unwrap().len(), 3);
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn stalled_cursor_ends_traversal() {
        let calls = RefCell::new(Vec::new());
        let pages = Paginated::new(|start| {
            calls.borrow_mut().push(start);
            Ok(match start {
                0 => page(
                    200,
                    json!({"data": [1], "additional_data": {"pagination": {"more_items_in_collection": true, "next_start": 3}}}),
                ),
                _ => page(
                    200,
                    json!({"data": [2], "additional_data": {"pagination": {"more_items_in_collection": true}}}),
                ),
            })
        });
        assert_eq!(items(pages.iter().take(50).map(Result::unwrap).collect()), vec![json!(1), json!(2)]);
        assert_eq!(*calls.borrow(), vec![0, 3]);
    }

    #[test]
    fn object_data_is_a_single_item() {
        let pages = Paginated::new(|_| Ok(page(200, json!({"data": {"id": 1}}))));
        assert_eq!(items(pages.all().unwrap()), vec![json!({"id": 1})]);
    }

    #[test]
    fn traversal_is_lazy_and_restartable() {
        let calls = RefCell::new(Vec::new());
        let pages = Paginated::new(|start| {
            calls.borrow_mut().push(start);
            Ok(if start == 0 {
                page(
                    200,
                    json!({"data": [1], "additional_data": {"pagination": {"more_items_in_collection": true, "next_start": 1}}}),
                )
            } else {
                page(200, json!({"data": [2]}))
            })
        });
        assert!(calls.borrow().is_empty());

        let mut iter = pages.iter();
        assert_eq!(iter.next().unwrap().unwrap(), Entry::Item(json!(1)));
        assert_eq!(*calls.borrow(), vec![0]);
        drop(iter);

        let first: Vec<_> = (&pages).into_iter().map(Result::unwrap).collect();
        let second = pages.all().unwrap();
        assert_eq!(first, second);
        assert_eq!(*calls.borrow(), vec![0, 0, 1, 0, 1]);
    }

    #[test]
    fn each_passes_entries_to_callback() {
        let pages = Paginated::new(|_| Ok(page(200, json!({"data": [1, 2]}))));
        let mut seen = Vec::new();
        pages.each(|entry| seen.push(entry)).unwrap();
        assert_eq!(items(seen), vec![json!(1), json!(2)]);
    }

    #[test]
    fn transport_error_is_yielded_once() {
        let pages = Paginated::new(|_| Err(Error::Transport(TransportError::Connection("refused".into()))));
        let mut iter = pages.iter();
        assert!(matches!(iter.next(), Some(Err(Error::Transport(_)))));
        assert!(iter.next().is_none());
        assert!(pages.each(|_| {}).is_err());
    }
}
