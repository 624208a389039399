//! Shared validation and request shaping for multipart uploads.

use std::path::Path;

use bytes::Bytes;

use crate::error::HttpError;
use crate::http::{Body, FilePart, HttpMethod, HttpRequest};
use crate::mime;

/// Per-upload settings. Defaults: no MIME override, accept `*/*`, `POST`,
/// field `file`.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub mime_type: Option<String>,
    pub accept: String,
    pub method: HttpMethod,
    pub field: String,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            mime_type: None,
            accept: mime::ANY.to_string(),
            method: HttpMethod::Post,
            field: "file".to_string(),
        }
    }
}

impl UploadOptions {
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = accept.into();
        self
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }
}

/// Validate the file name and resolve the part's MIME type. Runs before the
/// source is read or anything is sent.
pub(crate) fn resolve_mime_type(file_name: &str, options: &UploadOptions) -> Result<String, HttpError> {
    if file_name.trim().is_empty() {
        return Err(HttpError::InvalidArgument("file name must be set".into()));
    }
    if options.field.is_empty() {
        return Err(HttpError::InvalidArgument("form field name must be set".into()));
    }
    match &options.mime_type {
        Some(mime_type) => Ok(mime_type.clone()),
        None => mime::mime_type_for(file_name).ok_or_else(|| HttpError::MimeTypeNotFound {
            file_name: file_name.to_string(),
        }),
    }
}

pub(crate) fn attach(
    request: HttpRequest,
    file_name: &str,
    mime_type: String,
    options: &UploadOptions,
    data: Bytes,
) -> HttpRequest {
    request
        .with_method(options.method)
        .with_accept(options.accept.clone())
        .with_body(Body::Multipart(FilePart {
            field: options.field.clone(),
            file_name: file_name.to_string(),
            mime_type,
            data,
        }))
}

pub(crate) fn file_name_of(path: &Path) -> Result<String, HttpError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| HttpError::InvalidArgument(format!("{} has no file name", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_name_is_rejected() {
        let err = resolve_mime_type("", &UploadOptions::default()).unwrap_err();
        assert!(matches!(err, HttpError::InvalidArgument(_)));
    }

    #[test]
    fn mime_type_comes_from_extension() {
        let mime = resolve_mime_type("avatar.png", &UploadOptions::default()).unwrap();
        assert_eq!(mime, "image/png");
    }

    #[test]
    fn explicit_mime_type_wins() {
        let options = UploadOptions::default().mime_type("application/x-forum-backup");
        assert_eq!(
            resolve_mime_type("backup.bin", &options).unwrap(),
            "application/x-forum-backup"
        );
        assert_eq!(resolve_mime_type("no-extension", &options).unwrap(), "application/x-forum-backup");
    }

    #[test]
    fn unresolvable_mime_type_is_rejected() {
        let err = resolve_mime_type("no-extension", &UploadOptions::default()).unwrap_err();
        assert!(matches!(err, HttpError::MimeTypeNotFound { .. }));
        assert!(err.is_validation());
    }

    #[test]
    fn attach_sets_method_accept_and_part() {
        let request = HttpRequest::get("http://localhost/upload").unwrap();
        let options = UploadOptions::default().method(HttpMethod::Put).field("attachment");
        let request = attach(
            request,
            "notes.txt",
            "text/plain".into(),
            &options,
            Bytes::from_static(b"hello"),
        );
        assert_eq!(request.method, HttpMethod::Put);
        assert_eq!(request.accept, "*/*");
        match request.body() {
            Some(Body::Multipart(part)) => {
                assert_eq!(part.field, "attachment");
                assert_eq!(part.file_name, "notes.txt");
                assert_eq!(part.mime_type, "text/plain");
                assert_eq!(&part.data[..], b"hello");
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn file_name_of_path() {
        assert_eq!(file_name_of(Path::new("/tmp/upload/avatar.png")).unwrap(), "avatar.png");
        assert!(file_name_of(Path::new("/")).is_err());
    }
}
