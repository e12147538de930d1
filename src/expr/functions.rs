use evalexpr::{
    ContextWithMutableFunctions, EvalexprError, EvalexprResult, Function, HashMapContext, Value,
};
use rand::Rng;
use regex::Regex;

/// Context holding the helper functions available to every expression.
pub fn builtin_context() -> EvalexprResult<HashMapContext> {
    let mut ctx = HashMapContext::new();

    ctx.set_function("bcontains".into(), Function::new(|arg| {
        let (haystack, needle) = two_strings(arg)?;
        Ok(Value::Boolean(haystack.contains(&needle)))
    }))?;

    ctx.set_function("icontains".into(), Function::new(|arg| {
        let (haystack, needle) = two_strings(arg)?;
        Ok(Value::Boolean(haystack.to_lowercase().contains(&needle.to_lowercase())))
    }))?;

    ctx.set_function("starts_with".into(), Function::new(|arg| {
        let (text, prefix) = two_strings(arg)?;
        Ok(Value::Boolean(text.starts_with(&prefix)))
    }))?;

    ctx.set_function("ends_with".into(), Function::new(|arg| {
        let (text, suffix) = two_strings(arg)?;
        Ok(Value::Boolean(text.ends_with(&suffix)))
    }))?;

    ctx.set_function("matches".into(), Function::new(|arg| {
        let (pattern, text) = two_strings(arg)?;
        let re = Regex::new(&pattern)
            .map_err(|e| EvalexprError::CustomMessage(format!("invalid pattern '{}': {}", pattern, e)))?;
        Ok(Value::Boolean(re.is_match(&text)))
    }))?;

    ctx.set_function("randomInt".into(), Function::new(|arg| {
        let bounds = arg.as_fixed_len_tuple(2)?;
        let (min, max) = (bounds[0].as_int()?, bounds[1].as_int()?);
        if min >= max {
            return Err(EvalexprError::CustomMessage(format!(
                "randomInt needs min < max, got {} and {}", min, max
            )));
        }
        Ok(Value::Int(rand::thread_rng().gen_range(min..max)))
    }))?;

    ctx.set_function("randomLowercase".into(), Function::new(|arg| {
        let len = arg.as_int()?;
        if !(0..=4096).contains(&len) {
            return Err(EvalexprError::CustomMessage(format!("randomLowercase length out of range: {}", len)));
        }
        let mut rng = rand::thread_rng();
        let s: String = (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect();
        Ok(Value::String(s))
    }))?;

    Ok(ctx)
}

fn two_strings(arg: &Value) -> EvalexprResult<(String, String)> {
    let args = arg.as_fixed_len_tuple(2)?;
    Ok((args[0].as_string()?, args[1].as_string()?))
}
