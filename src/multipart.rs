//! `multipart/form-data` request bodies.
//!
//! A [`MultipartForm`] is a plain description of the parts to upload. It is
//! cloneable and transport-neutral; [`ReqwestTransport`](crate::transport::ReqwestTransport)
//! turns it into a `reqwest::multipart::Form` when the request is sent.

/// One field of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    /// The form field name.
    pub name: String,

    /// The part's content.
    pub data: Vec<u8>,

    /// The file name reported to the server, for file parts.
    pub file_name: Option<String>,

    /// The part's MIME type, for example `image/png`.
    pub mime: Option<String>,
}

/// The parts of a multipart upload, in order.
///
/// # Examples
///
/// ```
/// use outcall::MultipartForm;
///
/// let form = MultipartForm::new()
///     .text("title", "Holiday")
///     .file_bytes("photo", vec![0xFF, 0xD8], "beach.jpg", Some("image/jpeg"));
///
/// assert_eq!(form.len(), 2);
/// assert_eq!(form.parts()[1].file_name.as_deref(), Some("beach.jpg"));
/// assert_eq!(form.content_len(), 9);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<MultipartPart>,
}

impl MultipartForm {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text field.
    pub fn text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.part(MultipartPart {
            name: name.into(),
            data: value.into().into_bytes(),
            file_name: None,
            mime: None,
        })
    }

    /// Adds a file field from bytes in memory.
    pub fn file_bytes(
        self,
        name: impl Into<String>,
        data: impl Into<Vec<u8>>,
        file_name: impl Into<String>,
        mime: Option<&str>,
    ) -> Self {
        self.part(MultipartPart {
            name: name.into(),
            data: data.into(),
            file_name: Some(file_name.into()),
            mime: mime.map(str::to_string),
        })
    }

    /// Adds a prepared part.
    pub fn part(mut self, part: MultipartPart) -> Self {
        self.parts.push(part);
        self
    }

    /// The parts, in the order they were added.
    pub fn parts(&self) -> &[MultipartPart] {
        &self.parts
    }

    /// The number of parts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns `true` if the form has no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The combined size of all part contents, excluding multipart framing.
    pub fn content_len(&self) -> usize {
        self.parts.iter().map(|part| part.data.len()).sum()
    }

    /// Builds the `reqwest` form.
    ///
    /// Fails if a part's MIME type does not parse.
    pub(crate) fn into_reqwest(self) -> Result<reqwest::multipart::Form, reqwest::Error> {
        let mut form = reqwest::multipart::Form::new();
        for part in self.parts {
            let mut body = reqwest::multipart::Part::bytes(part.data);
            if let Some(file_name) = part.file_name {
                body = body.file_name(file_name);
            }
            if let Some(mime) = part.mime {
                body = body.mime_str(&mime)?;
            }
            form = form.part(part.name, body);
        }
        Ok(form)
    }
}
