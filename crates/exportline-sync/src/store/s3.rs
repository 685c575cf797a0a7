//! S3 over plain HTTPS: ListObjectsV2 + GET, unsigned
//!
//! Virtual-hosted URLs (`https://<bucket>.s3.<region>.amazonaws.com/`) by
//! default; a custom endpoint switches to path-style (`<endpoint>/<bucket>/`),
//! which is what S3-compatible servers expect.

use std::path::Path;

use exportline_core::{download_to_file, get_text};
use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::Url;

use super::{ObjectEntry, ObjectStore, StoreError, dir_prefix};

#[derive(Debug, Clone)]
pub struct S3Store {
    bucket: String,
    /// Bucket root, path ends in `/`
    base: Url,
}

impl S3Store {
    pub fn new(bucket: &str, region: &str) -> Result<Self, StoreError> {
        let base = format!("https://{bucket}.s3.{region}.amazonaws.com/");
        Self::with_base(bucket, &base)
    }

    /// Path-style addressing under a custom endpoint
    pub fn with_endpoint(bucket: &str, endpoint: &str) -> Result<Self, StoreError> {
        let base = format!("{}/{bucket}/", endpoint.trim_end_matches('/'));
        Self::with_base(bucket, &base)
    }

    fn with_base(bucket: &str, base: &str) -> Result<Self, StoreError> {
        let base = Url::parse(base).map_err(|e| StoreError::InvalidUrl(format!("{base}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(StoreError::InvalidUrl(base.to_string()));
        }
        Ok(Self {
            bucket: bucket.to_string(),
            base,
        })
    }

    fn object_url(&self, key: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(key.split('/'));
        }
        url
    }

    fn list_url(&self, prefix: &str, delimiter: bool, token: Option<&str>) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
        }
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("list-type", "2");
            query.append_pair("prefix", prefix);
            if delimiter {
                query.append_pair("delimiter", "/");
            }
            if let Some(token) = token {
                query.append_pair("continuation-token", token);
            }
        }
        url
    }

    /// Follow continuation tokens until the listing is complete
    fn list_all(&self, prefix: &str, delimiter: bool) -> Result<ListPage, StoreError> {
        let mut all = ListPage::default();
        let mut token: Option<String> = None;
        loop {
            let url = self.list_url(prefix, delimiter, token.as_deref());
            log::debug!("GET {url}");
            let body = get_text(url)?;
            let page = parse_list_page(&body).map_err(|message| StoreError::Listing {
                prefix: prefix.to_string(),
                message,
            })?;
            all.objects.extend(page.objects);
            all.prefixes.extend(page.prefixes);
            match page.next_token {
                Some(next) if page.is_truncated => token = Some(next),
                _ => break,
            }
        }
        Ok(all)
    }
}

impl ObjectStore for S3Store {
    fn describe(&self) -> String {
        format!("s3://{} ({})", self.bucket, self.base)
    }

    fn list_prefixes(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.list_all(&dir_prefix(prefix), true)?.prefixes)
    }

    fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StoreError> {
        Ok(self.list_all(&dir_prefix(prefix), false)?.objects)
    }

    fn download(&self, key: &str, dest: &Path) -> Result<u64, StoreError> {
        Ok(download_to_file(self.object_url(key), dest)?)
    }
}

#[derive(Debug, Default, PartialEq)]
struct ListPage {
    objects: Vec<ObjectEntry>,
    prefixes: Vec<String>,
    is_truncated: bool,
    next_token: Option<String>,
}

/// Parse one `ListBucketResult` document
fn parse_list_page(xml: &str) -> Result<ListPage, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut page = ListPage::default();
    let mut path: Vec<String> = Vec::new();
    let mut key: Option<String> = None;
    let mut size: Option<u64> = None;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => {
                path.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Event::End(_) => {
                if path.len() == 2 && path[1] == "Contents" {
                    match (key.take(), size.take()) {
                        (Some(key), Some(size)) => page.objects.push(ObjectEntry { key, size }),
                        (key, _) => log::debug!("Listing entry without key/size: {key:?}"),
                    }
                }
                path.pop();
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                let tail: Vec<&str> = path.iter().skip(1).map(String::as_str).collect();
                match tail.as_slice() {
                    ["Contents", "Key"] => key = Some(text.into_owned()),
                    ["Contents", "Size"] => {
                        size = Some(text.parse().map_err(|e| format!("bad Size {text:?}: {e}"))?)
                    }
                    ["CommonPrefixes", "Prefix"] => page.prefixes.push(text.into_owned()),
                    ["IsTruncated"] => page.is_truncated = text == "true",
                    ["NextContinuationToken"] => page.next_token = Some(text.into_owned()),
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(page)
}
