//! Thread-local cache of compiled query text.
//!
//! Capped at 256 entries; the whole cache is cleared when the cap is hit.

use crate::compiler::{compile, ParseError};
use crate::engine::ExpressionList;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

const MAX_CACHE_ENTRIES: usize = 256;

thread_local! {
    static QUERY_CACHE: RefCell<HashMap<String, Arc<ExpressionList>>> =
        RefCell::new(HashMap::new());
}

/// Get a compiled query from the cache, or compile and cache it.
///
/// Parse errors are returned and not cached.
pub fn get_or_compile(text: &str) -> Result<Arc<ExpressionList>, ParseError> {
    QUERY_CACHE.with(|cache| {
        if let Some(compiled) = cache.borrow().get(text) {
            trace!(query = text, "query cache hit");
            return Ok(Arc::clone(compiled));
        }

        trace!(query = text, "query cache miss");
        let compiled = Arc::new(compile(text)?);
        let mut cache = cache.borrow_mut();
        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }
        cache.insert(text.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    })
}

/// Clear the query cache (mainly for testing).
pub fn clear_cache() {
    QUERY_CACHE.with(|cache| cache.borrow_mut().clear());
}

pub fn cache_size() -> usize {
    QUERY_CACHE.with(|cache| cache.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiled_queries_are_shared() {
        clear_cache();
        let first = get_or_compile(".Send[message=create]").unwrap();
        let second = get_or_compile(".Send[message=create]").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache_size(), 1);
    }

    #[test]
    fn parse_errors_are_not_cached() {
        clear_cache();
        assert!(get_or_compile(".Send[message=").is_err());
        assert_eq!(cache_size(), 0);
    }

    #[test]
    fn cache_is_cleared_at_capacity() {
        clear_cache();
        for i in 0..MAX_CACHE_ENTRIES {
            get_or_compile(&format!(".Send[arity={i}]")).unwrap();
        }
        assert_eq!(cache_size(), MAX_CACHE_ENTRIES);
        get_or_compile(".Def").unwrap();
        assert_eq!(cache_size(), 1);
    }
}
