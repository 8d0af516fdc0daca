use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{LoxError, Result};
use crate::value::Value;

/// The `clock` built-in: wall-clock time in milliseconds as a number.
pub fn clock() -> Value {
    Value::NativeFunction {
        name: "clock".to_string(),
        arity: 0,
        func: clock_native,
    }
}

fn clock_native(_args: &[Value]) -> Result<Value> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| LoxError::runtime(0, format!("Clock error: {}", e)))?;

    Ok(Value::Number(elapsed.as_millis() as f64))
}
