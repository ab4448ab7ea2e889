// ── Plain-text command codec ──
//
// command := segment (";" segment)*
// segment := path | path "=" value
//
// Responses are `;`-joined tokens positionally ordered to the request.
// The codec does not escape: paths and values must not contain `;` or `=`.

use crate::error::Error;

/// One get (`value: None`) or set operation in a batched query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Op {
    pub path: String,
    pub value: Option<String>,
}

impl Op {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: None,
        }
    }

    pub fn set(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: Some(value.into()),
        }
    }

    fn segment(&self) -> String {
        match &self.value {
            Some(v) => format!("{}={v}", self.path),
            None => self.path.clone(),
        }
    }
}

/// Join operations into a single query string.
pub fn encode_batch(ops: &[Op]) -> Result<String, Error> {
    if ops.is_empty() {
        return Err(Error::Encoding {
            message: "operation list is empty".into(),
        });
    }
    Ok(ops.iter().map(Op::segment).collect::<Vec<_>>().join(";"))
}

/// Split a response into exactly `expected` tokens.
///
/// Fails on the device's error convention (case-insensitive `error`
/// anywhere in the body) and on any token-count mismatch.
pub fn decode_batch(response: &str, expected: usize) -> Result<Vec<String>, Error> {
    check_device_error(response)?;

    let tokens: Vec<String> = response
        .trim_end_matches(['\r', '\n'])
        .split(';')
        .map(|t| t.trim().to_owned())
        .collect();

    if tokens.len() != expected {
        return Err(Error::FieldCountMismatch {
            expected,
            actual: tokens.len(),
            body: response.to_owned(),
        });
    }
    Ok(tokens)
}

/// Reject bodies carrying the device's `error` marker.
pub fn check_device_error(response: &str) -> Result<(), Error> {
    if response.to_ascii_lowercase().contains("error") {
        return Err(Error::DeviceError {
            body: response.to_owned(),
        });
    }
    Ok(())
}

/// `"1"` (or `"true"`) is true, anything else is false.
pub fn parse_bool(token: &str) -> bool {
    let t = token.trim();
    t == "1" || t.eq_ignore_ascii_case("true")
}

pub fn parse_float(token: &str) -> Result<f64, Error> {
    token.trim().parse::<f64>().map_err(|_| Error::Type {
        token: token.to_owned(),
        expected: "float",
    })
}

/// Parse the sensor discovery list, e.g. `["sht-21","scd-co2"]`.
///
/// Bracket and quote characters are stripped and empty entries dropped,
/// so `[]` yields no sensors rather than one blank id.
pub fn parse_id_list(response: &str) -> Vec<String> {
    response
        .replace(['[', ']', '"', '\''], "")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
