use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::LazyLock;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::Once;

use lru::LruCache;
use metrics::Unit;
use metrics::counter;
use metrics::describe_counter;

use crate::parser::TsdocParser;

/// Number of distinct parser configurations kept alive.
pub const PARSER_CACHE_CAPACITY: usize = 10;

pub const PARSER_CACHE_HIT_TOTAL: &str = "tsdocfmt_parser_cache_hit_total";
pub const PARSER_CACHE_MISS_TOTAL: &str = "tsdocfmt_parser_cache_miss_total";
pub const PARSER_CACHE_EVICT_TOTAL: &str = "tsdocfmt_parser_cache_evict_total";

static GLOBAL_CACHE: LazyLock<ParserCache> = LazyLock::new(ParserCache::default);
static METRIC_DESCRIPTIONS: Once = Once::new();

/// Parsers keyed by their sorted set of extra tags.
pub struct ParserCache {
	entries: Mutex<LruCache<Vec<String>, Arc<TsdocParser>>>,
}

impl Default for ParserCache {
	fn default() -> Self {
		Self::new(NonZeroUsize::new(PARSER_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN))
	}
}

impl ParserCache {
	pub fn new(capacity: NonZeroUsize) -> Self {
		describe_metrics();
		Self {
			entries: Mutex::new(LruCache::new(capacity)),
		}
	}

	/// The process wide cache used by [`crate::parse_comment`] and the engine.
	pub fn global() -> &'static ParserCache {
		&GLOBAL_CACHE
	}

	/// Return the parser for `extra_tags`, building it on a miss.
	pub fn get_or_create(&self, extra_tags: &BTreeSet<String>) -> Arc<TsdocParser> {
		let key: Vec<String> = extra_tags.iter().cloned().collect();
		let mut entries = self.lock();

		if let Some(parser) = entries.get(&key) {
			counter!(PARSER_CACHE_HIT_TOTAL).increment(1);
			return Arc::clone(parser);
		}

		counter!(PARSER_CACHE_MISS_TOTAL).increment(1);
		let parser = Arc::new(TsdocParser::new(extra_tags.clone()));
		if let Some((evicted, _)) = entries.push(key, Arc::clone(&parser)) {
			counter!(PARSER_CACHE_EVICT_TOTAL).increment(1);
			tracing::trace!(?evicted, "evicted parser from cache");
		}

		parser
	}

	pub fn len(&self) -> usize {
		self.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.lock().is_empty()
	}

	pub fn clear(&self) {
		self.lock().clear();
	}

	fn lock(&self) -> MutexGuard<'_, LruCache<Vec<String>, Arc<TsdocParser>>> {
		match self.entries.lock() {
			Ok(guard) => guard,
			Err(poisoned) => {
				tracing::warn!(
					lock_kind = "mutex",
					result = "poisoned_recovered",
					"recovered from poisoned parser cache lock"
				);
				poisoned.into_inner()
			}
		}
	}
}

fn describe_metrics() {
	METRIC_DESCRIPTIONS.call_once(|| {
		describe_counter!(
			PARSER_CACHE_HIT_TOTAL,
			Unit::Count,
			"Total number of parser cache hits."
		);
		describe_counter!(
			PARSER_CACHE_MISS_TOTAL,
			Unit::Count,
			"Total number of parser cache misses."
		);
		describe_counter!(
			PARSER_CACHE_EVICT_TOTAL,
			Unit::Count,
			"Total number of parsers evicted due to capacity."
		);
	});
}
