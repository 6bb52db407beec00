//! Conversions between interpreter values and host types.

use std::sync::LazyLock;

use boa_engine::property::Attribute;
use boa_engine::{Context, JsError, JsNativeError, JsNativeErrorKind, JsResult, JsString, JsValue, js_string};
use regex::Regex;
use scriptbox_application::TestFailure;
use scriptbox_domain::{AssertionFailure, ScriptValue};

/// Hidden global holding the interpreter's own `JSON.stringify`, captured
/// before user code runs.
const STRINGIFY: &str = "__pw_stringify";

const ASSERTION_ERROR_NAME: &str = "AssertionError";

static LINE_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"line (\d+)").ok());

/// Copies `JSON.stringify` to a non-writable, non-configurable global.
pub(crate) fn capture_stringify(ctx: &mut Context) -> JsResult<()> {
    let json = ctx.global_object().get(js_string!("JSON"), ctx)?;
    let stringify = json
        .as_object()
        .ok_or_else(|| JsNativeError::typ().with_message("JSON is not available"))?
        .get(js_string!("stringify"), ctx)?;
    ctx.register_global_property(JsString::from(STRINGIFY), stringify, Attribute::empty())
}

/// Converts an interpreter value into a [`ScriptValue`].
///
/// Objects and arrays go through `JSON.stringify`, so functions and
/// `undefined` members are dropped the same way scripts would see them
/// serialized.
pub(crate) fn from_js(value: &JsValue, ctx: &mut Context) -> JsResult<ScriptValue> {
    if value.is_null_or_undefined() {
        return Ok(ScriptValue::Null);
    }
    if let Some(b) = value.as_boolean() {
        return Ok(ScriptValue::Bool(b));
    }
    if let Some(n) = value.as_number() {
        return Ok(ScriptValue::Number(n));
    }
    if let Some(s) = value.as_string() {
        return Ok(ScriptValue::String(s.to_std_string_escaped()));
    }
    let Some(object) = value.as_object() else {
        return Ok(ScriptValue::String(value.display().to_string()));
    };
    if object.is_callable() {
        return Ok(ScriptValue::String(value.display().to_string()));
    }

    let stringify = ctx.global_object().get(JsString::from(STRINGIFY), ctx)?;
    let Some(stringify) = stringify.as_callable() else {
        return Ok(ScriptValue::String(value.display().to_string()));
    };
    let json = stringify.call(&JsValue::undefined(), &[value.clone()], ctx)?;
    Ok(json.as_string().map_or(ScriptValue::Null, |text| {
        serde_json::from_str::<serde_json::Value>(&text.to_std_string_escaped())
            .map_or(ScriptValue::Null, ScriptValue::from)
    }))
}

/// Converts a [`ScriptValue`] into an interpreter value.
pub(crate) fn to_js(value: &ScriptValue, ctx: &mut Context) -> JsResult<JsValue> {
    JsValue::from_json(&value.to_json(), ctx)
}

/// Renders a value for console output: strings raw, `undefined` spelled out,
/// everything else through [`ScriptValue::to_display_string`].
pub(crate) fn display(value: &JsValue, ctx: &mut Context) -> JsResult<String> {
    if value.is_undefined() {
        return Ok("undefined".to_string());
    }
    if let Some(s) = value.as_string() {
        return Ok(s.to_std_string_escaped());
    }
    Ok(from_js(value, ctx)?.to_display_string())
}

/// Builds the error a failed matcher throws: an `Error` whose `name` is
/// `AssertionError`, carrying `expected` and `actual` properties.
pub(crate) fn assertion_error(failure: &AssertionFailure, ctx: &mut Context) -> JsError {
    let error = JsNativeError::error()
        .with_message(failure.message.clone())
        .to_opaque(ctx);
    let properties = [
        ("name", ASSERTION_ERROR_NAME),
        ("expected", failure.expected.as_str()),
        ("actual", failure.actual.as_str()),
    ];
    for (key, value) in properties {
        if let Err(err) =
            error.create_data_property_or_throw(JsString::from(key), JsString::from(value), ctx)
        {
            return err;
        }
    }
    JsError::from_opaque(error.into())
}

/// Recovers the failure from an error built by [`assertion_error`].
pub(crate) fn assertion_failure(err: &JsError, ctx: &mut Context) -> Option<AssertionFailure> {
    let object = err.as_opaque()?.as_object()?.clone();
    let name = object.get(js_string!("name"), ctx).ok()?;
    if name.as_string()?.to_std_string_escaped() != ASSERTION_ERROR_NAME {
        return None;
    }
    let mut field = |key: &str| {
        object
            .get(JsString::from(key), ctx)
            .ok()
            .and_then(|v| v.as_string().map(JsString::to_std_string_escaped))
            .unwrap_or_default()
    };
    let message = field("message");
    let expected = field("expected");
    let actual = field("actual");
    Some(AssertionFailure::new(message, expected, actual))
}

/// Whether the interpreter stopped the script for exhausting its loop
/// iteration budget. Script code cannot catch this, and it ends the whole
/// run. Hitting the call depth ceiling is an ordinary error instead.
pub(crate) fn is_loop_limit(err: &JsError) -> bool {
    err.as_native().is_some_and(|native| {
        matches!(native.kind, JsNativeErrorKind::RuntimeLimit)
            && native.message().to_ascii_lowercase().contains("loop")
    })
}

/// Whether the error is a syntax error.
pub(crate) fn is_syntax_error(err: &JsError, ctx: &mut Context) -> bool {
    err.try_native(ctx)
        .is_ok_and(|native| matches!(native.kind, JsNativeErrorKind::Syntax))
}

/// The message of a thrown value: an error's `message`, or the string form of
/// anything else that was thrown.
pub(crate) fn error_message(err: &JsError, ctx: &mut Context) -> String {
    match err.try_native(ctx) {
        Ok(native) if !native.message().is_empty() => native.message().to_string(),
        Ok(native) => native.kind.to_string(),
        Err(_) => err.as_opaque().map_or_else(
            || err.to_string(),
            |value| {
                value
                    .to_string(ctx)
                    .map_or_else(|_| value.display().to_string(), |s| s.to_std_string_escaped())
            },
        ),
    }
}

/// Line number embedded in an interpreter message, `0` when there is none.
pub(crate) fn line_of(message: &str) -> u32 {
    LINE_PATTERN
        .as_ref()
        .and_then(|pattern| pattern.captures(message))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Classifies an error thrown out of a `test()` block.
pub(crate) fn test_failure(err: &JsError, ctx: &mut Context) -> TestFailure {
    assertion_failure(err, ctx).map_or_else(
        || TestFailure::Error(error_message(err, ctx)),
        TestFailure::Assertion,
    )
}
