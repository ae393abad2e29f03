use axum::extract::Multipart;

use crate::error::ApiError;

/// Parsed form fields from a process-pdf upload.
pub struct UploadForm {
    pub filename: String,
    pub data: Vec<u8>,
    /// Optional explicit tool name from the form.
    pub tool: Option<String>,
}

/// Parse a multipart upload: a `file` part plus an optional `tool` field.
///
/// The PDF magic is checked here, before anything touches the disk.
pub async fn parse_upload(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut tool: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("failed to read form field: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload.pdf").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("failed to read file data: {e}")))?
                    .to_vec();
                file = Some((filename, data));
            }
            "tool" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("failed to read tool field: {e}")))?;
                if !value.trim().is_empty() {
                    tool = Some(value.trim().to_string());
                }
            }
            _ => {
                // Ignore unknown fields
                let _ = field.bytes().await;
            }
        }
    }

    let (filename, data) = file.ok_or_else(|| ApiError::bad_request("no file uploaded"))?;

    if data.is_empty() {
        return Err(ApiError::bad_request("uploaded file is empty"));
    }
    if !data.starts_with(b"%PDF-") {
        return Err(ApiError::bad_request(
            "uploaded file does not appear to be a valid PDF",
        ));
    }

    Ok(UploadForm {
        filename,
        data,
        tool,
    })
}
