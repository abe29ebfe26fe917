//! Structured parameter sets decoded from the query string and body.

use std::collections::BTreeMap;

use mailparse::parse_content_type;
use serde::Serialize;
use tracing::warn;
use url::form_urlencoded;

use super::multipart;

/// Parameter name to every value received for it, in arrival order.
pub type ParamMap = BTreeMap<String, Vec<String>>;

/// Metadata for one uploaded file. The content itself is not retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    pub filename: String,
    pub size: usize,
    /// Content-Type declared for the part, empty when the client sent none
    pub content_type: String,
    /// `sha256:<hex>` digest of the file content
    pub storage_ref: String,
}

/// Every structured view of one request's parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParameterSets {
    pub query: ParamMap,
    pub form: ParamMap,
    /// Query and form merged; form values win on a key collision
    pub request: ParamMap,
    pub files: BTreeMap<String, Vec<UploadedFile>>,
}

impl ParameterSets {
    /// Decode the query string and, for form content types, the buffered body.
    ///
    /// Bodies that fail to decode yield empty form and file sets.
    pub fn decode(query: Option<&str>, content_type: Option<&str>, body: &[u8]) -> Self {
        let query = query
            .map(|q| parse_urlencoded(q.as_bytes()))
            .unwrap_or_default();

        let (form, files) = match content_type {
            Some(raw) => decode_body(raw, body),
            None => (ParamMap::new(), BTreeMap::new()),
        };

        let request = merge(&query, &form);

        ParameterSets {
            query,
            form,
            request,
            files,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.form.is_empty() && self.files.is_empty()
    }
}

fn decode_body(
    content_type: &str,
    body: &[u8],
) -> (ParamMap, BTreeMap<String, Vec<UploadedFile>>) {
    let parsed = parse_content_type(content_type);

    match parsed.mimetype.as_str() {
        "application/x-www-form-urlencoded" => (parse_urlencoded(body), BTreeMap::new()),
        "multipart/form-data" => match multipart::decode(content_type, body) {
            Ok(form) => (form.fields, form.files),
            Err(e) => {
                warn!(error = %e, body_length = body.len(), "multipart_decode_failed");
                (ParamMap::new(), BTreeMap::new())
            }
        },
        _ => (ParamMap::new(), BTreeMap::new()),
    }
}

/// Parse `application/x-www-form-urlencoded` data, keeping repeated keys.
pub fn parse_urlencoded(input: &[u8]) -> ParamMap {
    let mut params = ParamMap::new();
    for (key, value) in form_urlencoded::parse(input) {
        params
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    params
}

/// Merge query and form parameters. A key present in both takes the form values.
pub fn merge(query: &ParamMap, form: &ParamMap) -> ParamMap {
    let mut merged = query.clone();
    for (key, values) in form {
        merged.insert(key.clone(), values.clone());
    }
    merged
}
