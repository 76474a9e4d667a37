//! Publishes dashboard snapshots to S3 so a static front end can serve them.

use anyhow::{Context, Result};
use aws_sdk_s3::primitives::ByteStream;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::io::Write;
use tracing::info;

/// Serializes `value` to JSON, gzip-compressing it when `gzip` is set.
///
/// Returns the body and the content encoding to send with it.
pub fn encode_json(value: &impl Serialize, gzip: bool) -> Result<(Vec<u8>, Option<&'static str>)> {
    let body = serde_json::to_vec(value)?;
    if !gzip {
        return Ok((body, None));
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&body)?;
    Ok((encoder.finish()?, Some("gzip")))
}

/// Uploads `value` as JSON to `bucket/key` with `application/json` content type.
#[tracing::instrument(skip_all, fields(bucket = %bucket, key = %key, gzip = gzip))]
pub async fn publish_json(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    value: &impl Serialize,
    gzip: bool,
) -> Result<()> {
    let (body, encoding) = encode_json(value, gzip)?;
    let size = body.len();

    let mut request = client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(body))
        .content_type("application/json");
    if let Some(encoding) = encoding {
        request = request.content_encoding(encoding);
    }

    request
        .send()
        .await
        .with_context(|| format!("uploading s3://{bucket}/{key}"))?;

    info!(bytes = size, "Dashboard snapshot published");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn test_plain_json() {
        let (body, encoding) = encode_json(&vec![1, 2, 3], false).unwrap();
        assert_eq!(body, b"[1,2,3]");
        assert_eq!(encoding, None);
    }

    #[test]
    fn test_gzip_json_decompresses() {
        let (body, encoding) = encode_json(&serde_json::json!({"a": 1}), true).unwrap();
        assert_eq!(encoding, Some("gzip"));

        let mut decoded = String::new();
        GzDecoder::new(body.as_slice())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, r#"{"a":1}"#);
    }
}
