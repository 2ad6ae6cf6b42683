use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;

use crate::{BlobError, BlobResult, CompletedPart, MultipartBackend, UploadId};

/// Calls observed by [`MemoryMultipartBackend`], in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Probe,
    Init { key: String, upload_id: UploadId },
    UploadPart { upload_id: UploadId, part_number: u32, size: usize },
    Complete { upload_id: UploadId, part_numbers: Vec<u32> },
    Abort { upload_id: UploadId },
}

#[derive(Default)]
struct PendingUpload {
    key: String,
    parts: BTreeMap<u32, (String, Bytes)>,
}

#[derive(Default)]
struct MemoryState {
    uploads: HashMap<String, PendingUpload>,
    objects: HashMap<String, Bytes>,
    calls: Vec<BackendCall>,
    next_upload: u64,
    fail_on_part: Option<u32>,
    fail_on_complete: bool,
}

/// In-process multipart backend. Keeps completed objects in memory and
/// records every call, with switches to fail a chosen step.
#[derive(Clone)]
pub struct MemoryMultipartBackend {
    bucket: String,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryMultipartBackend {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            state: Arc::new(Mutex::new(MemoryState::default())),
        }
    }

    /// Fail the upload of this part number
    pub fn fail_on_part(self, part_number: u32) -> Self {
        self.state.lock().fail_on_part = Some(part_number);
        self
    }

    /// Fail every completion call
    pub fn fail_on_complete(self) -> Self {
        self.state.lock().fail_on_complete = true;
        self
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().calls.clone()
    }

    /// Content of a completed object
    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.state.lock().objects.get(key).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.state.lock().objects.len()
    }

    /// Uploads initiated but neither completed nor aborted
    pub fn pending_uploads(&self) -> usize {
        self.state.lock().uploads.len()
    }
}

#[async_trait]
impl MultipartBackend for MemoryMultipartBackend {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn probe(&self) -> BlobResult<()> {
        self.state.lock().calls.push(BackendCall::Probe);
        Ok(())
    }

    async fn init_multipart(&self, key: &str) -> BlobResult<UploadId> {
        let mut state = self.state.lock();
        state.next_upload += 1;
        let upload_id = UploadId::from_string(format!("mem-upload-{}", state.next_upload));
        state.uploads.insert(
            upload_id.to_string(),
            PendingUpload {
                key: key.to_string(),
                parts: BTreeMap::new(),
            },
        );
        state.calls.push(BackendCall::Init {
            key: key.to_string(),
            upload_id: upload_id.clone(),
        });
        Ok(upload_id)
    }

    async fn put_part(
        &self,
        key: &str,
        upload_id: &UploadId,
        part_number: u32,
        body: Bytes,
    ) -> BlobResult<CompletedPart> {
        let mut state = self.state.lock();
        state.calls.push(BackendCall::UploadPart {
            upload_id: upload_id.clone(),
            part_number,
            size: body.len(),
        });
        if state.fail_on_part == Some(part_number) {
            return Err(BlobError::upload_failed(format!(
                "injected failure on part {}",
                part_number
            )));
        }

        let upload = state
            .uploads
            .get_mut(upload_id.as_str())
            .filter(|u| u.key == key)
            .ok_or_else(|| BlobError::upload_not_found(upload_id.as_str()))?;
        let etag = format!("\"{}-{}-{}\"", upload_id, part_number, body.len());
        upload.parts.insert(part_number, (etag.clone(), body));
        Ok(CompletedPart { part_number, etag })
    }

    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &UploadId,
        parts: &[CompletedPart],
    ) -> BlobResult<()> {
        let mut state = self.state.lock();
        state.calls.push(BackendCall::Complete {
            upload_id: upload_id.clone(),
            part_numbers: parts.iter().map(|p| p.part_number).collect(),
        });
        if state.fail_on_complete {
            return Err(BlobError::upload_failed("injected failure on complete"));
        }
        if parts.is_empty() {
            return Err(BlobError::invalid("completion needs at least one part"));
        }

        let upload = state
            .uploads
            .get(upload_id.as_str())
            .filter(|u| u.key == key)
            .ok_or_else(|| BlobError::upload_not_found(upload_id.as_str()))?;

        let mut content = BytesMut::new();
        for (index, part) in parts.iter().enumerate() {
            if part.part_number != index as u32 + 1 {
                return Err(BlobError::invalid(format!(
                    "part {} listed at position {}",
                    part.part_number,
                    index + 1
                )));
            }
            match upload.parts.get(&part.part_number) {
                Some((etag, body)) if *etag == part.etag => content.extend_from_slice(body),
                _ => {
                    return Err(BlobError::invalid(format!(
                        "part {} does not match an uploaded part",
                        part.part_number
                    )))
                }
            }
        }

        state.uploads.remove(upload_id.as_str());
        state.objects.insert(key.to_string(), content.freeze());
        Ok(())
    }

    async fn abort_multipart(&self, _key: &str, upload_id: &UploadId) -> BlobResult<()> {
        let mut state = self.state.lock();
        state.calls.push(BackendCall::Abort {
            upload_id: upload_id.clone(),
        });
        state
            .uploads
            .remove(upload_id.as_str())
            .map(|_| ())
            .ok_or_else(|| BlobError::upload_not_found(upload_id.as_str()))
    }
}
