use uuid::Uuid;

use crate::{
    error::{BoardError, BoardResult},
    storage::{self, ObjectStorage, MAX_UPLOAD_BYTES},
};

pub const RESUME_PREFIX: &str = "resumes";
pub const PHOTO_PREFIX: &str = "photos";

const RESUME_EXTENSIONS: [&str; 3] = ["pdf", "doc", "docx"];

/// A file received from a multipart form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }

    fn mime(&self) -> String {
        match &self.content_type {
            Some(content_type) if content_type != "application/octet-stream" => {
                content_type.to_ascii_lowercase()
            }
            _ => mime_guess::from_path(&self.file_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        }
    }
}

fn check_size(upload: &Upload) -> BoardResult<()> {
    if upload.bytes.is_empty() {
        return Err(BoardError::validation("Uploaded file is empty."));
    }
    if upload.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(BoardError::validation("File too large. Maximum size is 10 MB."));
    }
    Ok(())
}

pub fn check_resume(upload: &Upload) -> BoardResult<()> {
    check_size(upload)?;
    let allowed = upload
        .extension()
        .is_some_and(|ext| RESUME_EXTENSIONS.contains(&ext.as_str()));
    if !allowed {
        return Err(BoardError::validation(
            "Invalid file type. Please upload a PDF, DOC or DOCX resume.",
        ));
    }
    Ok(())
}

pub fn check_photo(upload: &Upload) -> BoardResult<()> {
    check_size(upload)?;
    if !upload.mime().starts_with("image/") {
        return Err(BoardError::validation(
            "Invalid file type. Please upload an image.",
        ));
    }
    Ok(())
}

/// Stores the upload under `<prefix>/<owner>-<digest>-<name>` and returns the key.
pub async fn put(
    storage: &dyn ObjectStorage,
    prefix: &str,
    owner: Uuid,
    upload: Upload,
) -> BoardResult<String> {
    let key = storage::content_key(prefix, owner, &upload.file_name, &upload.bytes);
    let content_type = Some(upload.mime());
    let disposition = storage::inline_content_disposition(&upload.file_name);
    storage
        .put_object(&key, upload.bytes, content_type, disposition)
        .await
        .map_err(BoardError::Storage)?;
    tracing::info!(user_id = %owner, key = %key, "file stored");
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, content_type: Option<&str>, len: usize) -> Upload {
        Upload {
            file_name: name.to_string(),
            content_type: content_type.map(str::to_string),
            bytes: vec![1; len],
        }
    }

    #[test]
    fn resumes_must_be_documents() {
        assert!(check_resume(&upload("cv.PDF", None, 10)).is_ok());
        assert!(check_resume(&upload("cv.docx", None, 10)).is_ok());
        assert!(check_resume(&upload("cv.exe", None, 10)).is_err());
        assert!(check_resume(&upload("cv", None, 10)).is_err());
        assert!(check_resume(&upload("cv.pdf", None, 0)).is_err());
        assert!(check_resume(&upload("cv.pdf", None, MAX_UPLOAD_BYTES + 1)).is_err());
    }

    #[test]
    fn photos_must_be_images() {
        assert!(check_photo(&upload("me.png", None, 10)).is_ok());
        assert!(check_photo(&upload("me.bin", Some("image/jpeg"), 10)).is_ok());
        assert!(check_photo(&upload("me.pdf", Some("application/pdf"), 10)).is_err());
    }
}
