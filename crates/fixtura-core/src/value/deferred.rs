//! Values computed at build time.
//!
//! A deferred value is stored in a definition and only turned into a concrete
//! value when the fixture is constructed, once per construction. The time
//! markers accept an optional offset such as `"+1d"` or `"-2y3m"`.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::Value;
use crate::error::{FixtureError, FixtureResult};

static DELTA_PART: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)([ymdhMs])").unwrap());

/// Callback producing a value at build time.
pub type ComputeFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// A value that is resolved when its fixture is built.
#[derive(Clone)]
pub enum Deferred {
	/// Current UTC time plus `delta`. Naive when `naive` is set.
	Now {
		/// Offset applied to the current time.
		delta: TimeDelta,
		/// Drop the timezone from the result.
		naive: bool,
	},
	/// Seconds since the epoch, as a float.
	EpochNow {
		/// Offset applied to the current time.
		delta: TimeDelta,
	},
	/// Milliseconds since the epoch, as an integer.
	EpochNowMs {
		/// Offset applied to the current time.
		delta: TimeDelta,
	},
	/// Host-supplied computation.
	Computed(ComputeFn),
}

impl Deferred {
	/// `!now` with an offset expression.
	pub fn now(delta: &str) -> FixtureResult<Self> {
		Ok(Self::Now {
			delta: parse_delta(delta)?,
			naive: false,
		})
	}

	/// `!now_naive` with an offset expression.
	pub fn now_naive(delta: &str) -> FixtureResult<Self> {
		Ok(Self::Now {
			delta: parse_delta(delta)?,
			naive: true,
		})
	}

	/// `!epoch_now` with an offset expression.
	pub fn epoch_now(delta: &str) -> FixtureResult<Self> {
		Ok(Self::EpochNow {
			delta: parse_delta(delta)?,
		})
	}

	/// `!epoch_now_in_ms` with an offset expression.
	pub fn epoch_now_ms(delta: &str) -> FixtureResult<Self> {
		Ok(Self::EpochNowMs {
			delta: parse_delta(delta)?,
		})
	}

	/// Wraps a host computation.
	pub fn computed(f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
		Self::Computed(Arc::new(f))
	}

	/// Produces the concrete value relative to `now`.
	///
	/// `timezone_aware` only affects [`Deferred::Now`] markers that were not
	/// explicitly declared naive.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::InvalidDelta`] if the offset moves the time
	/// outside the representable date range.
	pub fn resolve(&self, now: DateTime<Utc>, timezone_aware: bool) -> FixtureResult<Value> {
		let value = match self {
			Self::Now { delta, naive } => {
				let at = shift(now, *delta)?;
				if *naive || !timezone_aware {
					Value::NaiveDateTime(at.naive_utc())
				} else {
					Value::DateTime(at)
				}
			}
			Self::EpochNow { delta } => {
				let at = shift(now, *delta)?;
				Value::Float(at.timestamp() as f64 + f64::from(at.timestamp_subsec_micros()) / 1e6)
			}
			Self::EpochNowMs { delta } => Value::Integer(shift(now, *delta)?.timestamp_millis()),
			Self::Computed(f) => f(),
		};
		Ok(value)
	}

	/// Marker object form, as read by [`Value::from_marked_json`].
	///
	/// Computed values have no marker form and render as `null`.
	pub fn to_json(&self) -> serde_json::Value {
		let (marker, delta) = match self {
			Self::Now { delta, naive: false } => (super::NOW_MARKER, delta),
			Self::Now { delta, naive: true } => (super::NOW_NAIVE_MARKER, delta),
			Self::EpochNow { delta } => (super::EPOCH_NOW_MARKER, delta),
			Self::EpochNowMs { delta } => (super::EPOCH_NOW_MS_MARKER, delta),
			Self::Computed(_) => return serde_json::Value::Null,
		};
		let mut object = serde_json::Map::new();
		object.insert(marker.to_string(), serde_json::Value::String(format_delta(*delta)));
		serde_json::Value::Object(object)
	}
}

fn shift(now: DateTime<Utc>, delta: TimeDelta) -> FixtureResult<DateTime<Utc>> {
	now.checked_add_signed(delta).ok_or_else(|| {
		FixtureError::InvalidDelta(format!("{} is out of range", format_delta(delta)))
	})
}

impl fmt::Debug for Deferred {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Now { delta, naive } => f
				.debug_struct("Now")
				.field("delta", delta)
				.field("naive", naive)
				.finish(),
			Self::EpochNow { delta } => f.debug_struct("EpochNow").field("delta", delta).finish(),
			Self::EpochNowMs { delta } => {
				f.debug_struct("EpochNowMs").field("delta", delta).finish()
			}
			Self::Computed(_) => f.write_str("Computed(..)"),
		}
	}
}

impl PartialEq for Deferred {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(
				Self::Now { delta, naive },
				Self::Now {
					delta: other_delta,
					naive: other_naive,
				},
			) => delta == other_delta && naive == other_naive,
			(Self::EpochNow { delta }, Self::EpochNow { delta: other }) => delta == other,
			(Self::EpochNowMs { delta }, Self::EpochNowMs { delta: other }) => delta == other,
			(Self::Computed(f), Self::Computed(g)) => Arc::ptr_eq(f, g),
			_ => false,
		}
	}
}

/// Parses an offset expression into a [`TimeDelta`].
///
/// The grammar is a sign followed by one or more `<amount><unit>` parts.
/// Units: `y` (365 days), `m` (30 days), `d`, `h`, `M` (minutes), `s`.
/// Empty or blank text is a zero offset.
///
/// # Example
///
/// ```
/// # use fixtura_core::value::parse_delta;
/// # use chrono::TimeDelta;
/// assert_eq!(parse_delta("+10d2h").unwrap(), TimeDelta::days(10) + TimeDelta::hours(2));
/// assert_eq!(parse_delta("-1m").unwrap(), -TimeDelta::days(30));
/// assert_eq!(parse_delta("").unwrap(), TimeDelta::zero());
/// ```
pub fn parse_delta(text: &str) -> FixtureResult<TimeDelta> {
	let text = text.trim();
	if text.is_empty() {
		return Ok(TimeDelta::zero());
	}

	let invalid = || FixtureError::InvalidDelta(text.to_string());
	let (negative, body) = if let Some(body) = text.strip_prefix('+') {
		(false, body)
	} else if let Some(body) = text.strip_prefix('-') {
		(true, body)
	} else {
		return Err(invalid());
	};

	let mut total = TimeDelta::zero();
	let mut consumed = 0;
	for captures in DELTA_PART.captures_iter(body) {
		let whole = captures.get(0).ok_or_else(invalid)?;
		if whole.start() != consumed {
			return Err(invalid());
		}
		consumed = whole.end();

		let amount: i64 = captures[1].parse().map_err(|_| invalid())?;
		let part = match &captures[2] {
			"y" => TimeDelta::try_days(amount.checked_mul(365).ok_or_else(invalid)?),
			"m" => TimeDelta::try_days(amount.checked_mul(30).ok_or_else(invalid)?),
			"d" => TimeDelta::try_days(amount),
			"h" => TimeDelta::try_hours(amount),
			"M" => TimeDelta::try_minutes(amount),
			"s" => TimeDelta::try_seconds(amount),
			_ => None,
		}
		.ok_or_else(invalid)?;
		total = total.checked_add(&part).ok_or_else(invalid)?;
	}

	if consumed == 0 || consumed != body.len() {
		return Err(invalid());
	}

	Ok(if negative { -total } else { total })
}

/// Renders an offset in the grammar accepted by [`parse_delta`], using the
/// largest whole units: `+1d2h`, `-30s`. A zero offset renders as the empty
/// string.
pub fn format_delta(delta: TimeDelta) -> String {
	if delta.is_zero() {
		return String::new();
	}
	let sign = if delta < TimeDelta::zero() { '-' } else { '+' };
	let mut seconds = delta.num_seconds().unsigned_abs();
	let mut out = String::from(sign);
	for (unit, size) in [('d', 86_400), ('h', 3_600), ('M', 60), ('s', 1)] {
		if seconds >= size {
			out.push_str(&format!("{}{}", seconds / size, unit));
			seconds %= size;
		}
	}
	if out.len() == 1 {
		out.push_str("0s");
	}
	out
}
