//! `multipart/form-data` decoding using mailparse.
//!
//! HTTP form uploads share the MIME multipart format, so the buffered body is
//! parsed as a message whose only header is the request's Content-Type.

use std::collections::BTreeMap;

use mailparse::{parse_mail, DispositionType, MailHeaderMap, MailParseError, ParsedMail};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::params::{ParamMap, UploadedFile};

/// Fields and files from one multipart body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: ParamMap,
    pub files: BTreeMap<String, Vec<UploadedFile>>,
}

/// Decode a multipart body. `content_type` must carry the boundary parameter.
pub fn decode(content_type: &str, body: &[u8]) -> Result<MultipartForm, MailParseError> {
    let mut raw = format!("Content-Type: {}\r\n\r\n", content_type).into_bytes();
    raw.extend_from_slice(body);

    let mail = parse_mail(&raw)?;
    let mut form = MultipartForm::default();

    for (index, part) in mail.subparts.iter().enumerate() {
        let disposition = part.get_content_disposition();
        if !matches!(disposition.disposition, DispositionType::FormData) {
            debug!(part_index = index, "multipart_part_skipped");
            continue;
        }

        let Some(name) = disposition.params.get("name").cloned() else {
            debug!(part_index = index, "multipart_part_unnamed");
            continue;
        };

        let bytes = part.get_body_raw()?;
        let content = strip_boundary_break(&bytes);

        match disposition.params.get("filename") {
            Some(filename) => {
                let file = describe_file(filename, part, content);
                form.files.entry(name).or_default().push(file);
            }
            None => {
                let value = String::from_utf8_lossy(content).into_owned();
                form.fields.entry(name).or_default().push(value);
            }
        }
    }

    Ok(form)
}

/// The line break before the next delimiter belongs to the boundary, not the part.
fn strip_boundary_break(content: &[u8]) -> &[u8] {
    content
        .strip_suffix(b"\r\n")
        .or_else(|| content.strip_suffix(b"\n"))
        .unwrap_or(content)
}

fn describe_file(filename: &str, part: &ParsedMail, content: &[u8]) -> UploadedFile {
    UploadedFile {
        filename: filename.to_string(),
        size: content.len(),
        content_type: part
            .headers
            .get_first_value("Content-Type")
            .unwrap_or_default(),
        storage_ref: format!("sha256:{}", hex::encode(Sha256::digest(content))),
    }
}
