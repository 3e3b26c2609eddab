//! Connection authentication handler.

use ed25519_dalek::{Signature, VerifyingKey};
use serde_json::Value;

use super::Result;
use crate::auth::Session;
use crate::rpc::RpcError;

/// Bind the connection to the address of `public_key`, proven by
/// `signature` over the current challenge.
pub fn authenticate(session: &mut Session, params: &Value) -> Result {
    let public_key: [u8; 32] = param_bytes(params, "public_key")?;
    let signature: [u8; 64] = param_bytes(params, "signature")?;

    let public_key = VerifyingKey::from_bytes(&public_key)
        .map_err(|e| RpcError::invalid_params(&format!("public_key: {e}")))?;
    let signature = Signature::from_bytes(&signature);

    let address = session.authenticate(&public_key, &signature)?;
    Ok(serde_json::json!({"address": address.to_string()}))
}

fn param_bytes<const N: usize>(
    params: &Value,
    key: &str,
) -> std::result::Result<[u8; N], RpcError> {
    let text = params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))?;
    let bytes = hex::decode(text.trim_start_matches("0x"))
        .map_err(|e| RpcError::invalid_params(&format!("{key}: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| RpcError::invalid_params(&format!("{key} must be {} bytes", N)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{address_of, challenge_message};
    use ed25519_dalek::{Signer, SigningKey};

    #[test]
    fn test_authenticate_from_hex_params() {
        let signer = SigningKey::from_bytes(&[3; 32]);
        let mut session = Session::new();
        let signature = signer.sign(&challenge_message(session.challenge()));

        let result = authenticate(
            &mut session,
            &serde_json::json!({
                "public_key": hex::encode(signer.verifying_key().as_bytes()),
                "signature": hex::encode(signature.to_bytes()),
            }),
        )
        .expect("authenticate");
        let expected = address_of(&signer.verifying_key());
        assert_eq!(result["address"], expected.to_string());
        assert_eq!(session.caller().expect("caller"), expected);
    }

    #[test]
    fn test_malformed_params_are_invalid() {
        let mut session = Session::new();
        let err = authenticate(
            &mut session,
            &serde_json::json!({"public_key": "00", "signature": "00"}),
        )
        .expect_err("short key");
        assert_eq!(err.code, -32602);
        assert!(session.caller().is_err());
    }
}
