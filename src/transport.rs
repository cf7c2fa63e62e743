//! Client transport: payloads travel as a JSON array with base64 `code`.
//!
//! Base64 keeps arbitrary markup (quotes, `</script>`, newlines) from
//! colliding with the JSON or the inline script that carries it.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{EngineConfig, InjectionPayload};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid base64 payload code: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid payload JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Wire form of an [`InjectionPayload`].
///
/// `position` stays a string here: the runtime treats unknown values as
/// `append` instead of rejecting the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedPayload {
    pub selector: String,
    #[serde(default)]
    pub position: String,
    pub code: String,
}

impl From<&InjectionPayload> for EncodedPayload {
    fn from(payload: &InjectionPayload) -> Self {
        Self {
            selector: payload.selector.clone(),
            position: payload.position.as_str().to_owned(),
            code: encode_code(&payload.code),
        }
    }
}

#[must_use]
pub fn encode_code(code: &str) -> String {
    B64.encode(code.as_bytes())
}

/// Decode transported code.
///
/// Bytes that are not valid UTF-8 are decoded one byte per character
/// (Latin-1) rather than rejected.
///
/// # Errors
///
/// Returns [`TransportError::Base64`] when the input is not base64.
pub fn decode_code(encoded: &str) -> Result<String, TransportError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = B64.decode(compact.as_bytes())?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => {
            tracing::debug!(
                valid_up_to = err.utf8_error().valid_up_to(),
                "payload code is not utf-8, decoding raw bytes"
            );
            Ok(err.into_bytes().into_iter().map(char::from).collect())
        }
    }
}

/// Serialize payloads to the JSON array the runtime consumes.
///
/// # Errors
///
/// Returns [`TransportError::Json`] if serialization fails.
pub fn to_json(payloads: &[InjectionPayload]) -> Result<String, TransportError> {
    let encoded: Vec<EncodedPayload> = payloads.iter().map(EncodedPayload::from).collect();
    Ok(serde_json::to_string(&encoded)?)
}

/// Parse the JSON array produced by [`to_json`].
///
/// # Errors
///
/// Returns [`TransportError::Json`] on malformed JSON.
pub fn from_json(json: &str) -> Result<Vec<EncodedPayload>, TransportError> {
    Ok(serde_json::from_str(json)?)
}

/// Inline script statement assigning the payload array to the configured
/// global. Emitted once per page; with no payloads it assigns `[]`.
///
/// # Errors
///
/// Returns [`TransportError::Json`] if serialization fails.
pub fn global_script(
    payloads: &[InjectionPayload],
    config: &EngineConfig,
) -> Result<String, TransportError> {
    // `<\/` keeps a selector containing "</script>" from ending the host tag.
    let json = to_json(payloads)?.replace("</", "<\\/");
    Ok(format!("window.{} = {json};", config.payload_global))
}

/// Module script body that loads [`EngineConfig::runtime_module`] and hands
/// it the payload global. `None` when no module is configured; the host
/// then runs the injector itself.
#[must_use]
pub fn bootstrap_script(config: &EngineConfig) -> Option<String> {
    let module = config.runtime_module.as_deref()?;
    Some(format!(
        "import init, {{ injectPayloads }} from \"{module}\";\n\
         init().then(() => injectPayloads(\"{}\"));",
        config.payload_global
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StandardPosition;

    #[test]
    fn code_round_trip_with_emoji() {
        let code = "<div data-x=\"ü\">🎉 héllo</div>";
        assert_eq!(decode_code(&encode_code(code)).unwrap(), code);
    }

    #[test]
    fn decode_ignores_whitespace() {
        let encoded = encode_code("<b>bold</b>");
        let (a, b) = encoded.split_at(4);
        assert_eq!(decode_code(&format!("{a}\n {b}")).unwrap(), "<b>bold</b>");
    }

    #[test]
    fn invalid_utf8_falls_back_to_raw_bytes() {
        let encoded = B64.encode([0x3c, 0x62, 0x3e, 0xe9, 0x3c, 0x2f, 0x62, 0x3e]);
        assert_eq!(decode_code(&encoded).unwrap(), "<b>é</b>");
    }

    #[test]
    fn invalid_base64_is_an_error() {
        assert!(matches!(
            decode_code("***not base64***"),
            Err(TransportError::Base64(_))
        ));
    }

    #[test]
    fn json_round_trip() {
        let payloads = vec![
            InjectionPayload::new("#a", StandardPosition::Prepend, "<script>go()</script>"),
            InjectionPayload::new(".b", StandardPosition::Replace, "\"quoted\""),
        ];
        let json = to_json(&payloads).unwrap();
        assert!(!json.contains("<script>"));
        let back = from_json(&json).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].position, "prepend");
        assert_eq!(decode_code(&back[1].code).unwrap(), "\"quoted\"");
    }

    #[test]
    fn missing_position_defaults_to_empty() {
        let back = from_json(r##"[{"selector": "#a", "code": "eA=="}]"##).unwrap();
        assert_eq!(back[0].position, "");
    }

    #[test]
    fn global_script_with_no_payloads() {
        let script = global_script(&[], &EngineConfig::default()).unwrap();
        assert_eq!(script, "window.sdiPayloads = [];");
    }

    #[test]
    fn bootstrap_needs_a_module() {
        assert_eq!(bootstrap_script(&EngineConfig::default()), None);
    }

    #[test]
    fn bootstrap_calls_the_export_with_the_global() {
        let config = EngineConfig {
            runtime_module: Some("/pkg/snippet_injector.js".into()),
            ..EngineConfig::default()
        };
        let script = bootstrap_script(&config).unwrap();
        assert_eq!(
            script,
            "import init, { injectPayloads } from \"/pkg/snippet_injector.js\";\n\
             init().then(() => injectPayloads(\"sdiPayloads\"));"
        );
    }

    #[test]
    fn global_script_escapes_closing_tags() {
        let payloads = vec![InjectionPayload::new(
            "div[data-x='</script>']",
            StandardPosition::Append,
            "x",
        )];
        let script = global_script(&payloads, &EngineConfig::default()).unwrap();
        assert!(!script.contains("</script>"));
        assert!(script.contains("<\\/script>"));
    }
}
