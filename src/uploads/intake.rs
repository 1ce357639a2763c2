//! Request intake for resource writes.
//!
//! Write endpoints accept either `multipart/form-data` (the only way to
//! attach images) or a JSON object. Both end up as an [`UploadForm`]: text
//! fields in [`FormFields`], image parts staged on disk.

use std::collections::HashMap;

use axum::async_trait;
use axum::extract::multipart::Field;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::Json;
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;

use super::{StagedFile, StorageError, UploadManager};

pub const MAX_FILE_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_FILES: usize = 2;

const ALLOWED_IMAGE_TYPES: [&str; 5] = ["jpeg", "jpg", "png", "gif", "webp"];
const IMAGE_TYPE_MESSAGE: &str = "Only image files (jpeg, jpg, png, gif, webp) are allowed!";

/// Which file parts an endpoint accepts.
#[derive(Debug, Clone, Copy)]
pub struct UploadRules {
    pub file_fields: &'static [&'static str],
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    /// Client-correctable problem with the submitted body.
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Submitted non-file fields. Multipart text parts arrive as strings, JSON
/// bodies keep their value types. Repeated keys are preserved.
#[derive(Debug, Default, Clone)]
pub struct FormFields {
    values: HashMap<String, Vec<Value>>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.entry(name.into()).or_default().push(value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.values.get(name).and_then(|values| values.last())
    }

    /// Scalar field as text. `null` counts as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        match self.raw(name)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Every value submitted under `name`. Arrays are flattened and single
    /// strings split on commas, so `a,b`, `["a","b"]` and two `a`/`b` parts
    /// all read the same.
    pub fn list(&self, name: &str) -> Option<Vec<String>> {
        let values = self.values.get(name)?;
        let mut items = Vec::new();
        for value in values {
            match value {
                Value::Array(inner) => items.extend(inner.iter().map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })),
                Value::String(s) => items.extend(s.split(',').map(str::to_string)),
                Value::Null => {}
                other => items.push(other.to_string()),
            }
        }
        Some(
            items
                .into_iter()
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
        )
    }
}

impl From<Map<String, Value>> for FormFields {
    fn from(map: Map<String, Value>) -> Self {
        let mut fields = Self::new();
        for (name, value) in map {
            fields.insert(name, value);
        }
        fields
    }
}

/// Parsed write request: text fields plus staged files keyed by field name.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: FormFields,
    files: HashMap<String, StagedFile>,
}

impl UploadForm {
    pub fn from_fields(fields: FormFields) -> Self {
        Self {
            fields,
            files: HashMap::new(),
        }
    }

    pub fn insert_file(&mut self, field: impl Into<String>, file: StagedFile) {
        self.files.insert(field.into(), file);
    }

    pub fn take_file(&mut self, field: &str) -> Option<StagedFile> {
        self.files.remove(field)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Raw write body, before any file is staged.
pub enum FormBody {
    Multipart(Multipart),
    Json(Map<String, Value>),
    Empty,
}

#[async_trait]
impl<S> FromRequest<S> for FormBody
where
    S: Send + Sync,
{
    type Rejection = IntakeError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase());

        match content_type.as_deref() {
            Some(ct) if ct.starts_with("multipart/form-data") => {
                let multipart = Multipart::from_request(req, state)
                    .await
                    .map_err(|e| IntakeError::Rejected(e.body_text()))?;
                Ok(Self::Multipart(multipart))
            }
            Some(ct) if ct.starts_with("application/json") => {
                let Json(map) = Json::<Map<String, Value>>::from_request(req, state)
                    .await
                    .map_err(|e| IntakeError::Rejected(e.body_text()))?;
                Ok(Self::Json(map))
            }
            None => Ok(Self::Empty),
            Some(other) => Err(IntakeError::Rejected(format!(
                "Unsupported content type '{other}'"
            ))),
        }
    }
}

impl FormBody {
    /// Reads the body, staging every accepted image. Files staged before a
    /// rejection are dropped, which deletes them.
    pub async fn read(
        self,
        uploads: &UploadManager,
        rules: UploadRules,
    ) -> Result<UploadForm, IntakeError> {
        match self {
            Self::Empty => Ok(UploadForm::default()),
            Self::Json(map) => Ok(UploadForm::from_fields(map.into())),
            Self::Multipart(mut multipart) => {
                let mut form = UploadForm::default();
                while let Some(field) = multipart
                    .next_field()
                    .await
                    .map_err(|e| IntakeError::Rejected(e.body_text()))?
                {
                    let Some(name) = field.name().map(str::to_string) else {
                        continue;
                    };

                    if field.file_name().is_none() {
                        let value = field
                            .text()
                            .await
                            .map_err(|e| IntakeError::Rejected(e.body_text()))?;
                        form.fields.insert(name, value);
                        continue;
                    }

                    if let Some(staged) = stage_file(field, &name, uploads, rules).await? {
                        if form.files.contains_key(&name) {
                            return Err(IntakeError::Rejected(format!(
                                "Only one file is allowed for '{name}'"
                            )));
                        }
                        if form.files.len() >= MAX_FILES {
                            return Err(IntakeError::Rejected(format!(
                                "At most {MAX_FILES} files may be uploaded at once"
                            )));
                        }
                        form.files.insert(name, staged);
                    }
                }
                Ok(form)
            }
        }
    }
}

async fn stage_file(
    mut field: Field<'_>,
    name: &str,
    uploads: &UploadManager,
    rules: UploadRules,
) -> Result<Option<StagedFile>, IntakeError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    // Browsers submit an empty part for an untouched file input.
    if file_name.is_empty() {
        return Ok(None);
    }

    if !rules.file_fields.contains(&name) {
        return Err(IntakeError::Rejected(format!("Unexpected file field '{name}'")));
    }

    let content_type = field.content_type().unwrap_or_default().to_string();
    if !is_allowed_image(&file_name, &content_type) {
        return Err(IntakeError::Rejected(IMAGE_TYPE_MESSAGE.to_string()));
    }

    let (staged, mut file) = uploads.stage(&file_name).await?;
    let mut written = 0usize;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| IntakeError::Rejected(e.body_text()))?
    {
        written += chunk.len();
        if written > MAX_FILE_BYTES {
            return Err(IntakeError::Rejected(format!(
                "File '{file_name}' exceeds the {} MB limit",
                MAX_FILE_BYTES / (1024 * 1024)
            )));
        }
        file.write_all(&chunk)
            .await
            .map_err(|e| IntakeError::Storage(StorageError::Stage(e)))?;
    }
    file.flush()
        .await
        .map_err(|e| IntakeError::Storage(StorageError::Stage(e)))?;

    tracing::debug!(field = name, file_name, bytes = written, "Staged upload");
    Ok(Some(staged))
}

/// Both the extension and the declared content type must name an image type.
fn is_allowed_image(file_name: &str, content_type: &str) -> bool {
    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let ext_ok = ext
        .as_deref()
        .is_some_and(|ext| ALLOWED_IMAGE_TYPES.contains(&ext));

    let content_type = content_type.to_ascii_lowercase();
    let mime_ok = ALLOWED_IMAGE_TYPES.iter().any(|t| content_type.contains(t));

    ext_ok && mime_ok
}
