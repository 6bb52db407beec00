//! The API surface installed into every sandbox.
//!
//! `pw.env`, `pw.test`, `pw.expect` (also reachable as bare `env`, `test`,
//! `expect`), `console`, a host `Date` with only `now()`, a `Math` subset and,
//! for post-response scripts, a read-only `pw.response` / `response`.

use boa_engine::object::ObjectInitializer;
use boa_engine::property::Attribute;
use boa_engine::{
    Context, JsArgs, JsNativeError, JsObject, JsResult, JsString, JsValue, NativeFunction,
    js_string,
};
use scriptbox_application::TestFailure;
use scriptbox_domain::{AssertionResult, Expectation, ResponseContext, ScriptKind, ScriptValue};

use super::convert;
use super::session::with_session;

const READ_ONLY: Attribute = Attribute::ENUMERABLE;
const GLOBAL: Attribute = Attribute::WRITABLE.union(Attribute::CONFIGURABLE);

/// Installs every binding for a script of `kind`.
pub(crate) fn install(
    ctx: &mut Context,
    kind: ScriptKind,
    response: Option<&ResponseContext>,
) -> JsResult<()> {
    convert::capture_stringify(ctx)?;

    let env = env_object(ctx);
    let test = test_function(ctx)?;
    let expect = NativeFunction::from_fn_ptr(expect_create).to_js_function(ctx.realm());
    let response = match kind {
        ScriptKind::PostResponse => {
            let synthetic;
            let response = match response {
                Some(response) => response,
                None => {
                    synthetic = ResponseContext::synthetic(200, "");
                    &synthetic
                }
            };
            Some(response_object(response, ctx)?)
        }
        ScriptKind::PreRequest => None,
    };

    let mut pw = ObjectInitializer::new(ctx);
    pw.property(js_string!("env"), env.clone(), READ_ONLY)
        .property(js_string!("test"), test.clone(), READ_ONLY)
        .property(js_string!("expect"), expect.clone(), READ_ONLY);
    if let Some(response) = &response {
        pw.property(js_string!("response"), response.clone(), READ_ONLY);
    }
    let pw = pw.build();

    let console = console_object(ctx);
    let date = date_object(ctx);
    let math = math_object(ctx);

    let mut globals: Vec<(JsString, JsValue)> = vec![
        (js_string!("pw"), pw.into()),
        (js_string!("env"), env.into()),
        (js_string!("test"), test.into()),
        (js_string!("expect"), expect.into()),
        (js_string!("console"), console.into()),
        (js_string!("Date"), date.into()),
        (js_string!("Math"), math.into()),
    ];
    if let Some(response) = response {
        globals.push((js_string!("response"), response.into()));
    }
    for (name, value) in globals {
        ctx.register_global_property(name, value, GLOBAL)?;
    }
    Ok(())
}

fn string_arg(args: &[JsValue], index: usize, ctx: &mut Context) -> JsResult<String> {
    Ok(args
        .get_or_undefined(index)
        .to_string(ctx)?
        .to_std_string_escaped())
}

// env

fn env_object(ctx: &mut Context) -> JsObject {
    ObjectInitializer::new(ctx)
        .function(NativeFunction::from_fn_ptr(env_set), js_string!("set"), 2)
        .function(NativeFunction::from_fn_ptr(env_get), js_string!("get"), 1)
        .function(NativeFunction::from_fn_ptr(env_has), js_string!("has"), 1)
        .function(NativeFunction::from_fn_ptr(env_delete), js_string!("delete"), 1)
        .build()
}

fn env_set(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let key = string_arg(args, 0, ctx)?;
    let value = string_arg(args, 1, ctx)?;
    with_session(|session| {
        if !session.is_abandoned() {
            session.environment.set(key, value);
        }
    })?;
    Ok(JsValue::undefined())
}

fn env_get(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let key = string_arg(args, 0, ctx)?;
    let value = with_session(|session| session.environment.get(&key))?;
    Ok(value.map_or_else(JsValue::null, |v| JsString::from(v.as_str()).into()))
}

fn env_has(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let key = string_arg(args, 0, ctx)?;
    Ok(with_session(|session| session.environment.has(&key))?.into())
}

fn env_delete(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let key = string_arg(args, 0, ctx)?;
    with_session(|session| {
        if !session.is_abandoned() {
            session.environment.delete(&key);
        }
    })?;
    Ok(JsValue::undefined())
}

// test

fn test_function(ctx: &mut Context) -> JsResult<JsObject> {
    let test = NativeFunction::from_fn_ptr(test_run).to_js_function(ctx.realm());
    let skip = NativeFunction::from_fn_ptr(test_skip).to_js_function(ctx.realm());
    test.create_data_property_or_throw(js_string!("skip"), skip, ctx)?;
    Ok(test.into())
}

fn test_run(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let name = string_arg(args, 0, ctx)?;
    let recorder = with_session(|session| session.recorder.clone())?;
    let Some(block) = args.get_or_undefined(1).as_callable().cloned() else {
        recorder.run_test(name, || {
            Err(TestFailure::Error("test body is not a function".to_string()))
        });
        return Ok(JsValue::undefined());
    };

    let mut aborted = None;
    recorder.run_test(name, || match block.call(&JsValue::undefined(), &[], ctx) {
        Ok(_) => Ok(()),
        Err(err) if convert::is_loop_limit(&err) => {
            aborted = Some(err);
            Err(TestFailure::Aborted)
        }
        Err(err) => Err(convert::test_failure(&err, ctx)),
    });
    aborted.map_or(Ok(JsValue::undefined()), Err)
}

fn test_skip(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let name = string_arg(args, 0, ctx)?;
    with_session(|session| session.recorder.skip(name))?;
    Ok(JsValue::undefined())
}

// expect

const ACTUAL: &str = "__actual";
const NEGATED: &str = "__negated";

type Matcher = fn(&Expectation, &ScriptValue) -> AssertionResult<()>;

fn expect_create(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let actual = args.get_or_undefined(0).clone();
    let not = NativeFunction::from_fn_ptr(expect_not).to_js_function(ctx.realm());
    let chain = ObjectInitializer::new(ctx)
        .property(JsString::from(ACTUAL), actual, Attribute::empty())
        .property(JsString::from(NEGATED), false, Attribute::WRITABLE)
        .accessor(js_string!("not"), Some(not), None, Attribute::CONFIGURABLE)
        .function(NativeFunction::from_fn_ptr(to_be), js_string!("toBe"), 1)
        .function(NativeFunction::from_fn_ptr(to_equal), js_string!("toEqual"), 1)
        .function(NativeFunction::from_fn_ptr(to_be_truthy), js_string!("toBeTruthy"), 0)
        .function(NativeFunction::from_fn_ptr(to_be_falsy), js_string!("toBeFalsy"), 0)
        .function(NativeFunction::from_fn_ptr(to_be_null), js_string!("toBeNull"), 0)
        .function(NativeFunction::from_fn_ptr(to_contain), js_string!("toContain"), 1)
        .function(
            NativeFunction::from_fn_ptr(to_be_greater_than),
            js_string!("toBeGreaterThan"),
            1,
        )
        .function(
            NativeFunction::from_fn_ptr(to_be_less_than),
            js_string!("toBeLessThan"),
            1,
        )
        .function(
            NativeFunction::from_fn_ptr(to_have_length),
            js_string!("toHaveLength"),
            1,
        )
        .build();
    Ok(chain.into())
}

fn chain_of(this: &JsValue) -> JsResult<&JsObject> {
    this.as_object().ok_or_else(|| {
        JsNativeError::typ()
            .with_message("matcher called outside an expect() chain")
            .into()
    })
}

/// `.not` getter: flips the chain's negation flag and returns the chain.
fn expect_not(this: &JsValue, _args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let chain = chain_of(this)?;
    let negated = chain.get(JsString::from(NEGATED), ctx)?.to_boolean();
    chain.set(JsString::from(NEGATED), !negated, true, ctx)?;
    Ok(this.clone())
}

fn check(this: &JsValue, args: &[JsValue], ctx: &mut Context, matcher: Matcher) -> JsResult<JsValue> {
    let chain = chain_of(this)?;
    let actual = chain.get(JsString::from(ACTUAL), ctx)?;
    let negated = chain.get(JsString::from(NEGATED), ctx)?.to_boolean();
    let expectation = Expectation::with_negation(convert::from_js(&actual, ctx)?, negated);
    let expected = convert::from_js(args.get_or_undefined(0), ctx)?;
    match matcher(&expectation, &expected) {
        Ok(()) => Ok(this.clone()),
        Err(failure) => Err(convert::assertion_error(&failure, ctx)),
    }
}

fn to_be(this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    check(this, args, ctx, |e, v| e.to_be(v).map(|_| ()))
}

fn to_equal(this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    check(this, args, ctx, |e, v| e.to_equal(v).map(|_| ()))
}

fn to_be_truthy(this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    check(this, args, ctx, |e, _| e.to_be_truthy().map(|_| ()))
}

fn to_be_falsy(this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    check(this, args, ctx, |e, _| e.to_be_falsy().map(|_| ()))
}

fn to_be_null(this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    check(this, args, ctx, |e, _| e.to_be_null().map(|_| ()))
}

fn to_contain(this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    check(this, args, ctx, |e, v| e.to_contain(v).map(|_| ()))
}

fn to_be_greater_than(this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    check(this, args, ctx, |e, v| e.to_be_greater_than(v).map(|_| ()))
}

fn to_be_less_than(this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    check(this, args, ctx, |e, v| e.to_be_less_than(v).map(|_| ()))
}

fn to_have_length(this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    check(this, args, ctx, |e, v| e.to_have_length(v).map(|_| ()))
}

// console

fn console_object(ctx: &mut Context) -> JsObject {
    ObjectInitializer::new(ctx)
        .function(NativeFunction::from_fn_ptr(console_log), js_string!("log"), 0)
        .function(NativeFunction::from_fn_ptr(console_warn), js_string!("warn"), 0)
        .function(NativeFunction::from_fn_ptr(console_error), js_string!("error"), 0)
        .build()
}

fn console_line(args: &[JsValue], ctx: &mut Context) -> JsResult<String> {
    let parts = args
        .iter()
        .map(|arg| convert::display(arg, ctx))
        .collect::<JsResult<Vec<_>>>()?;
    Ok(parts.join(" "))
}

fn console_log(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let line = console_line(args, ctx)?;
    with_session(|session| session.recorder.log(line))?;
    Ok(JsValue::undefined())
}

fn console_warn(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let line = console_line(args, ctx)?;
    with_session(|session| session.recorder.warn(line))?;
    Ok(JsValue::undefined())
}

fn console_error(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let line = console_line(args, ctx)?;
    with_session(|session| session.recorder.error(line))?;
    Ok(JsValue::undefined())
}

// Date and Math

fn date_object(ctx: &mut Context) -> JsObject {
    ObjectInitializer::new(ctx)
        .function(NativeFunction::from_fn_ptr(date_now), js_string!("now"), 0)
        .build()
}

#[allow(clippy::cast_precision_loss)]
fn date_now(_this: &JsValue, _args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(chrono::Utc::now().timestamp_millis() as f64))
}

fn math_object(ctx: &mut Context) -> JsObject {
    ObjectInitializer::new(ctx)
        .function(NativeFunction::from_fn_ptr(math_random), js_string!("random"), 0)
        .function(NativeFunction::from_fn_ptr(math_floor), js_string!("floor"), 1)
        .function(NativeFunction::from_fn_ptr(math_ceil), js_string!("ceil"), 1)
        .function(NativeFunction::from_fn_ptr(math_round), js_string!("round"), 1)
        .function(NativeFunction::from_fn_ptr(math_abs), js_string!("abs"), 1)
        .function(NativeFunction::from_fn_ptr(math_min), js_string!("min"), 2)
        .function(NativeFunction::from_fn_ptr(math_max), js_string!("max"), 2)
        .function(NativeFunction::from_fn_ptr(math_pow), js_string!("pow"), 2)
        .function(NativeFunction::from_fn_ptr(math_sqrt), js_string!("sqrt"), 1)
        .build()
}

fn number_arg(args: &[JsValue], index: usize, ctx: &mut Context) -> JsResult<f64> {
    args.get_or_undefined(index).to_number(ctx)
}

fn unary(args: &[JsValue], ctx: &mut Context, op: fn(f64) -> f64) -> JsResult<JsValue> {
    Ok(JsValue::from(op(number_arg(args, 0, ctx)?)))
}

fn math_random(_this: &JsValue, _args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(rand::random::<f64>()))
}

fn math_floor(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    unary(args, ctx, f64::floor)
}

fn math_ceil(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    unary(args, ctx, f64::ceil)
}

/// Halves round towards positive infinity, so `round(-2.5)` is `-2`.
fn math_round(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    unary(args, ctx, |x| if x.is_finite() { (x + 0.5).floor() } else { x })
}

fn math_abs(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    unary(args, ctx, f64::abs)
}

fn math_sqrt(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    unary(args, ctx, f64::sqrt)
}

fn math_pow(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let base = number_arg(args, 0, ctx)?;
    let exponent = number_arg(args, 1, ctx)?;
    if exponent.is_nan() {
        return Ok(JsValue::from(f64::NAN));
    }
    Ok(JsValue::from(base.powf(exponent)))
}

fn fold_numbers(
    args: &[JsValue],
    ctx: &mut Context,
    init: f64,
    pick: fn(f64, f64) -> f64,
) -> JsResult<JsValue> {
    let mut acc = init;
    for arg in args {
        let n = arg.to_number(ctx)?;
        acc = if n.is_nan() || acc.is_nan() { f64::NAN } else { pick(acc, n) };
    }
    Ok(JsValue::from(acc))
}

fn math_min(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    fold_numbers(args, ctx, f64::INFINITY, f64::min)
}

fn math_max(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    fold_numbers(args, ctx, f64::NEG_INFINITY, f64::max)
}

// response

#[allow(clippy::cast_precision_loss)]
fn response_object(response: &ResponseContext, ctx: &mut Context) -> JsResult<JsObject> {
    let body = convert::to_js(&response.body_value(), ctx)?;
    let headers = convert::to_js(&response.headers_value(), ctx)?;
    Ok(ObjectInitializer::new(ctx)
        .property(js_string!("status"), i32::from(response.status_code), READ_ONLY)
        .property(js_string!("body"), body, READ_ONLY)
        .property(js_string!("headers"), headers, READ_ONLY)
        .property(js_string!("time"), response.response_time_ms as f64, READ_ONLY)
        .property(js_string!("size"), response.response_size_bytes as f64, READ_ONLY)
        .build())
}
