//! IPC command handlers.
//!
//! Each submodule implements the commands for one IPC category. Amounts
//! cross the wire as decimal strings (they are `u128`); plain JSON numbers
//! are accepted on input when they fit in a `u64`.

pub mod admin;
pub mod auth;
pub mod funds;
pub mod query;

use serde_json::Value;
use yousplit_types::{Address, Amount, Bps};

use crate::rpc::RpcError;

pub type Result = std::result::Result<Value, RpcError>;

pub(crate) fn amount_json(amount: Amount) -> Value {
    Value::String(amount.to_string())
}

pub(crate) fn param_address(
    params: &Value,
    key: &str,
) -> std::result::Result<Address, RpcError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))?
        .parse()
        .map_err(|e| RpcError::invalid_params(&format!("{key}: {e}")))
}

pub(crate) fn param_amount(params: &Value, key: &str) -> std::result::Result<Amount, RpcError> {
    match params.get(key) {
        Some(Value::String(s)) => s
            .parse()
            .map_err(|e| RpcError::invalid_params(&format!("{key}: {e}"))),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Amount::from)
            .ok_or_else(|| {
                RpcError::invalid_params(&format!("{key} must be a non-negative integer"))
            }),
        _ => Err(RpcError::invalid_params(&format!("{key} required"))),
    }
}

pub(crate) fn param_bps(params: &Value, key: &str) -> std::result::Result<Bps, RpcError> {
    params
        .get(key)
        .and_then(|v| v.as_u64())
        .and_then(|v| Bps::try_from(v).ok())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

pub(crate) fn param_bool(params: &Value, key: &str) -> std::result::Result<bool, RpcError> {
    params
        .get(key)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_amount_accepts_string_and_number() {
        let params = serde_json::json!({
            "a": "340282366920938463463374607431768211455",
            "b": 42,
            "c": -1,
            "d": "12x",
        });
        assert_eq!(param_amount(&params, "a").expect("string"), u128::MAX);
        assert_eq!(param_amount(&params, "b").expect("number"), 42);
        assert!(param_amount(&params, "c").is_err());
        assert!(param_amount(&params, "d").is_err());
        assert!(param_amount(&params, "missing").is_err());
    }

    #[test]
    fn test_param_address() {
        let params = serde_json::json!({"who": format!("0x{}", "ab".repeat(20)), "bad": "0x12"});
        assert_eq!(param_address(&params, "who").expect("parse"), Address::repeat(0xab));
        let err = param_address(&params, "bad").expect_err("short");
        assert_eq!(err.code, -32602);
    }

    #[test]
    fn test_amount_json_is_decimal_string() {
        assert_eq!(amount_json(u128::MAX), Value::String(u128::MAX.to_string()));
    }
}
