//! Text views of scalar signals
//!
//! [`as_text`] presents any signal of a [`TextValue`] as a `String` signal.
//! The rendered text is memoized in the data graph, keyed by the source
//! signal's identity, so formatting runs once per value change. Writes
//! parse back into the source type and reject bad input (including
//! out-of-range integers) with a validation error the caller can display.

use weft_signals::{CanRead, Signal, ValidationError, WriteResult};

use weft_identity::Id;

use crate::context::Context;
use crate::cursor::{get_keyed_data, KeyedSignal};

/// Values that convert to and from display text.
pub trait TextValue: Clone + 'static {
    fn to_text(&self) -> String;
    fn parse_text(text: &str) -> Result<Self, ValidationError>;
}

macro_rules! impl_text_value {
    ($($ty:ty),+ $(,)?) => {$(
        impl TextValue for $ty {
            fn to_text(&self) -> String {
                self.to_string()
            }

            fn parse_text(text: &str) -> Result<Self, ValidationError> {
                text.trim().parse::<$ty>().map_err(|err| {
                    ValidationError::new(format!(
                        "not a valid {}: {err}",
                        stringify!($ty)
                    ))
                })
            }
        }
    )+};
}

impl_text_value!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char,
);

impl TextValue for String {
    fn to_text(&self) -> String {
        self.clone()
    }

    fn parse_text(text: &str) -> Result<Self, ValidationError> {
        Ok(text.to_string())
    }
}

/// A `String` view of another signal. See [`as_text`].
pub struct TextView<S> {
    wrapped: S,
    text: KeyedSignal<String>,
}

impl<S: Clone> Clone for TextView<S> {
    fn clone(&self) -> Self {
        Self {
            wrapped: self.wrapped.clone(),
            text: self.text.clone(),
        }
    }
}

impl<S> Signal for TextView<S>
where
    S: Signal,
    S::Value: TextValue,
{
    type Value = String;
    type Dir = S::Dir;

    fn has_value(&self) -> bool {
        self.text.has_value()
    }

    fn value_id(&self) -> Id {
        self.text.value_id()
    }

    fn read(&self) -> String {
        self.text.read()
    }

    fn ready_to_write(&self) -> bool {
        self.wrapped.ready_to_write()
    }

    fn write(&self, text: String) -> WriteResult {
        let parsed = S::Value::parse_text(&text)?;
        self.wrapped.write(parsed)
    }
}

/// Present `signal` as text, memoizing the rendering in the data graph.
///
/// The cached string regenerates when the source signal's identity changes.
/// Writing parses the text back into the source's value type; a failed
/// parse is a validation error and leaves the source untouched.
pub fn as_text<S>(ctx: &mut Context, signal: S) -> TextView<S>
where
    S: Signal,
    S::Dir: CanRead,
    S::Value: TextValue,
{
    let key = signal.value_id();
    let (text, needs_update) = get_keyed_data::<String>(ctx, &key);
    if needs_update && signal.has_value() {
        let rendered = signal.read().to_text();
        let _ = text.write(rendered);
    }
    TextView {
        wrapped: signal,
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_round_trips() {
        assert_eq!(42i32.to_text(), "42");
        assert_eq!(i32::parse_text("42").unwrap(), 42);
        assert_eq!(i32::parse_text(" -7 ").unwrap(), -7);
        assert_eq!(f64::parse_text("2.5").unwrap(), 2.5);
        assert_eq!(bool::parse_text("true").unwrap(), true);
    }

    #[test]
    fn test_out_of_range_integers_rejected() {
        assert!(u8::parse_text("256").is_err());
        assert!(i8::parse_text("-129").is_err());
        assert!(u32::parse_text("-1").is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(i32::parse_text("twelve").is_err());
        assert!(f64::parse_text("").is_err());
    }
}
