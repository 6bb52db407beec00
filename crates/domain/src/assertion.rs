//! The `expect(value)` assertion chain.
//!
//! An [`Expectation`] wraps the actual value produced by a script. Matchers
//! return the chain itself on success so calls can be chained, and an
//! [`AssertionFailure`] carrying a message plus the expected and actual
//! renderings on failure.
//!
//! Negation is sticky: [`Expectation::not`] flips a flag stored on the chain and
//! every later matcher on the same chain sees it, so
//! `expect(x).not.toBe(1).toBe(2)` asserts that `x` is neither `1` nor `2`.

use thiserror::Error;

use crate::value::ScriptValue;

/// A failed assertion raised by a matcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AssertionFailure {
    /// Human-readable failure message.
    pub message: String,
    /// What the matcher expected, rendered as text.
    pub expected: String,
    /// What the script actually produced, rendered as text.
    pub actual: String,
}

impl AssertionFailure {
    /// Creates a new failure.
    #[must_use]
    pub fn new(
        message: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Result of a matcher call.
pub type AssertionResult<T> = Result<T, AssertionFailure>;

/// An assertion chain over one actual value.
#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    actual: ScriptValue,
    negated: bool,
}

impl Expectation {
    /// Starts a new, non-negated chain.
    #[must_use]
    pub const fn new(actual: ScriptValue) -> Self {
        Self {
            actual,
            negated: false,
        }
    }

    /// Rebuilds a chain whose negation flag was stored elsewhere (the sandbox
    /// keeps it on the script-side chain object).
    #[must_use]
    pub const fn with_negation(actual: ScriptValue, negated: bool) -> Self {
        Self { actual, negated }
    }

    /// The value under test.
    #[must_use]
    pub const fn actual(&self) -> &ScriptValue {
        &self.actual
    }

    /// Whether the chain is currently negated.
    #[must_use]
    pub const fn is_negated(&self) -> bool {
        self.negated
    }

    /// Flips the sticky negation flag.
    pub const fn not(&mut self) -> &mut Self {
        self.negated = !self.negated;
        self
    }

    /// Value equality.
    ///
    /// # Errors
    ///
    /// Returns an [`AssertionFailure`] when the values differ (or are equal on a
    /// negated chain).
    pub fn to_be(&self, expected: &ScriptValue) -> AssertionResult<&Self> {
        let shown = describe(expected);
        self.verdict(
            self.actual == *expected,
            expected.to_display_string(),
            |not| format!("Expected {} {not}to be {shown}", describe(&self.actual)),
        )
    }

    /// Structural equality over arrays and objects.
    ///
    /// # Errors
    ///
    /// Returns an [`AssertionFailure`] when the structures differ.
    pub fn to_equal(&self, expected: &ScriptValue) -> AssertionResult<&Self> {
        let shown = describe(expected);
        self.verdict(
            self.actual == *expected,
            expected.to_display_string(),
            |not| format!("Expected {} {not}to equal {shown}", describe(&self.actual)),
        )
    }

    /// Truthiness check.
    ///
    /// # Errors
    ///
    /// Returns an [`AssertionFailure`] when the value is falsy.
    pub fn to_be_truthy(&self) -> AssertionResult<&Self> {
        self.verdict(self.actual.is_truthy(), "truthy".to_string(), |not| {
            format!("Expected {} {not}to be truthy", describe(&self.actual))
        })
    }

    /// Falsiness check.
    ///
    /// # Errors
    ///
    /// Returns an [`AssertionFailure`] when the value is truthy.
    pub fn to_be_falsy(&self) -> AssertionResult<&Self> {
        self.verdict(!self.actual.is_truthy(), "falsy".to_string(), |not| {
            format!("Expected {} {not}to be falsy", describe(&self.actual))
        })
    }

    /// Null check.
    ///
    /// # Errors
    ///
    /// Returns an [`AssertionFailure`] when the value is not null.
    pub fn to_be_null(&self) -> AssertionResult<&Self> {
        self.verdict(self.actual.is_null(), "null".to_string(), |not| {
            format!("Expected {} {not}to be null", describe(&self.actual))
        })
    }

    /// Substring test over the display strings of both sides.
    ///
    /// # Errors
    ///
    /// Returns an [`AssertionFailure`] when the substring is absent.
    pub fn to_contain(&self, expected: &ScriptValue) -> AssertionResult<&Self> {
        let needle = expected.to_display_string();
        let haystack = self.actual.to_display_string();
        self.verdict(haystack.contains(&needle), needle.clone(), |not| {
            format!("Expected \"{haystack}\" {not}to contain \"{needle}\"")
        })
    }

    /// Numeric `>` after coercing both sides.
    ///
    /// # Errors
    ///
    /// Returns an [`AssertionFailure`] when the comparison does not hold.
    pub fn to_be_greater_than(&self, expected: &ScriptValue) -> AssertionResult<&Self> {
        let (actual, bound) = (self.actual.to_number(), expected.to_number());
        self.verdict(actual > bound, format!("> {}", expected.to_display_string()), |not| {
            format!(
                "Expected {} {not}to be greater than {}",
                describe(&self.actual),
                describe(expected)
            )
        })
    }

    /// Numeric `<` after coercing both sides.
    ///
    /// # Errors
    ///
    /// Returns an [`AssertionFailure`] when the comparison does not hold.
    pub fn to_be_less_than(&self, expected: &ScriptValue) -> AssertionResult<&Self> {
        let (actual, bound) = (self.actual.to_number(), expected.to_number());
        self.verdict(actual < bound, format!("< {}", expected.to_display_string()), |not| {
            format!(
                "Expected {} {not}to be less than {}",
                describe(&self.actual),
                describe(expected)
            )
        })
    }

    /// Length of a string or collection.
    ///
    /// # Errors
    ///
    /// Returns an [`AssertionFailure`] when the length differs or the value has
    /// no length at all.
    #[allow(clippy::cast_precision_loss)]
    pub fn to_have_length(&self, expected: &ScriptValue) -> AssertionResult<&Self> {
        let wanted = expected.to_number();
        let length = self.actual.length();
        let matches = length.is_some_and(|len| len as f64 == wanted);
        let wanted_text = expected.to_display_string();
        let failure = self.verdict(matches, format!("length {wanted_text}"), |not| {
            length.map_or_else(
                || {
                    format!(
                        "Expected {} {not}to have length {wanted_text}, but it has no length",
                        describe(&self.actual)
                    )
                },
                |len| {
                    format!(
                        "Expected {} {not}to have length {wanted_text}, but its length is {len}",
                        describe(&self.actual)
                    )
                },
            )
        });
        failure.map_err(|mut err| {
            err.actual = length.map_or_else(|| "no length".to_string(), |len| format!("length {len}"));
            err
        })
    }

    /// Applies the negation flag to a raw outcome. `message` receives `"not "`
    /// on a negated chain and `""` otherwise.
    fn verdict(
        &self,
        passed: bool,
        expected: String,
        message: impl FnOnce(&str) -> String,
    ) -> AssertionResult<&Self> {
        if passed != self.negated {
            return Ok(self);
        }
        let not = if self.negated { "not " } else { "" };
        Err(AssertionFailure {
            message: message(not),
            expected: format!("{not}{expected}"),
            actual: self.actual.to_display_string(),
        })
    }
}

/// Renders an operand inside a message: strings are quoted so `"5"` and `5`
/// read differently.
fn describe(value: &ScriptValue) -> String {
    match value {
        ScriptValue::String(s) => format!("\"{s}\""),
        other => other.to_display_string(),
    }
}
