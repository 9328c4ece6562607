//! Prefix truncation expander
//!
//! Some listing APIs take a name prefix, return at most `max_results` items in
//! lexicographic order, and offer no continuation token. A full page may or
//! may not be the whole story, and the only way to see past it is to ask again
//! with a longer prefix.
//!
//! For a full page under `prefix` whose last name is `lastName`, with `c` the
//! character of `lastName` right after `prefix`:
//!
//! - the page itself covers everything up to `lastName`
//! - `prefix + c` covers the rest of that slice; whatever it returns up to and
//!   including `lastName` is dropped as already seen
//! - `prefix + d` for every alphabet character `d` after `c` covers a slice
//!   that sorts after everything seen so far
//!
//! Completeness depends on two assumptions that this module cannot check. Every
//! name must be drawn from `alphabet`, and the remote ordering must be exactly
//! byte-wise lexicographic and stable across calls. If the service sorts only
//! "roughly", items can be missed without any error.

use super::error::{CollectError, Result};
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use std::future::Future;

type Fetcher<T> = Box<dyn Fn(String) -> BoxFuture<'static, Result<Vec<T>>> + Send + Sync>;
type NameOf<T> = Box<dyn Fn(&T) -> String + Send + Sync>;

pub struct PrefixTruncationExpander<T> {
    fetcher: Fetcher<T>,
    name_of: NameOf<T>,
    alphabet: Vec<char>,
    max_results: usize,
}

impl<T> PrefixTruncationExpander<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// `alphabet` must list, in ascending order, every character that can
    /// follow a prefix. `max_results` is the page size that means "maybe more".
    pub fn new<F, Fut, N>(fetcher: F, name_of: N, alphabet: &str, max_results: usize) -> Result<Self>
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<T>>> + Send + 'static,
        N: Fn(&T) -> String + Send + Sync + 'static,
    {
        let alphabet: Vec<char> = alphabet.chars().collect();

        if alphabet.is_empty() {
            return Err(expansion_error("", "alphabet is empty"));
        }
        if let Some(pair) = alphabet.windows(2).find(|w| w[0] >= w[1]) {
            return Err(expansion_error(
                "",
                format!("alphabet is not strictly ascending at {:?}{:?}", pair[0], pair[1]),
            ));
        }
        if max_results == 0 {
            return Err(expansion_error("", "max_results must be at least 1"));
        }

        Ok(Self {
            fetcher: Box::new(move |prefix| fetcher(prefix).boxed()),
            name_of: Box::new(name_of),
            alphabet,
            max_results,
        })
    }

    /// Everything whose name starts with `prefix`
    pub fn expand<'a>(&'a self, prefix: &str) -> BoxFuture<'a, Result<Vec<T>>> {
        let prefix = prefix.to_string();

        async move {
            let page = (self.fetcher)(prefix.clone()).await?;
            if page.len() < self.max_results {
                return Ok(page);
            }

            let last = page[page.len() - 1].clone();
            let last_name = (self.name_of)(&last);

            let Some(rest) = last_name.strip_prefix(prefix.as_str()) else {
                return Err(expansion_error(
                    &prefix,
                    format!("result {:?} does not start with the prefix", last_name),
                ));
            };

            // an exact match on the prefix means every other name is longer
            let (equal_prefix, first_greater) = match rest.chars().next() {
                Some(c) => {
                    let index = self.alphabet.iter().position(|&a| a == c).ok_or_else(|| {
                        expansion_error(&prefix, format!("{:?} in {:?} is outside the alphabet", c, last_name))
                    })?;
                    (Some(format!("{}{}", prefix, c)), index + 1)
                }
                None => (None, 0),
            };

            tracing::debug!(
                prefix = %prefix,
                last = %last_name,
                branches = self.alphabet.len() - first_greater,
                "listing truncated; expanding"
            );

            let equal = async {
                match &equal_prefix {
                    Some(p) => {
                        let found = self.expand(p).await?;
                        Ok::<_, CollectError>(after_last(found, &last, &last_name, &*self.name_of))
                    }
                    None => Ok(Vec::new()),
                }
            };

            let greater = try_join_all(
                self.alphabet[first_greater..]
                    .iter()
                    .map(|c| self.expand(&format!("{}{}", prefix, c))),
            );

            let (equal, greater) = futures::try_join!(equal, greater)?;

            let mut all = page;
            all.extend(equal);
            all.extend(greater.into_iter().flatten());
            Ok(all)
        }
        .boxed()
    }
}

/// Drop everything up to and including `last`
fn after_last<T: PartialEq>(
    found: Vec<T>,
    last: &T,
    last_name: &str,
    name_of: &(dyn Fn(&T) -> String + Send + Sync),
) -> Vec<T> {
    match found.iter().position(|item| item == last) {
        Some(index) => found.into_iter().skip(index + 1).collect(),
        None => {
            tracing::warn!(
                last = %last_name,
                "last result vanished on re-listing; keeping only later names"
            );
            found
                .into_iter()
                .filter(|item| name_of(item).as_str() > last_name)
                .collect()
        }
    }
}

fn expansion_error(prefix: &str, message: impl Into<String>) -> CollectError {
    CollectError::Expansion {
        prefix: prefix.to_string(),
        message: message.into(),
    }
}
