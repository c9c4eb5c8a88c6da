use std::collections::HashMap;

use axum::extract::Multipart;
use tracing::error;

use crate::{error::AppError, uploads::Upload};

/// Text fields of a multipart form plus the file sent under `file_field`.
#[derive(Debug, Default)]
pub struct Form {
    pub fields: HashMap<String, String>,
    pub file: Option<Upload>,
}

impl Form {
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }
}

pub async fn read_form(mut multipart: Multipart, file_field: &str) -> Result<Form, AppError> {
    let mut form = Form::default();

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == file_field {
            let file_name = field.file_name().map(str::to_string).unwrap_or_default();
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await.map_err(|err| {
                error!(error = %err, "failed to read file bytes");
                AppError::bad_request(format!("failed to read file bytes: {err}"))
            })?;
            if file_name.is_empty() && data.is_empty() {
                continue;
            }
            form.file = Some(Upload {
                file_name,
                content_type,
                bytes: data.to_vec(),
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|err| AppError::bad_request(format!("invalid field {name}: {err}")))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}
