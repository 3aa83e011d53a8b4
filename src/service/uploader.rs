use crate::models::{UploadFile, UploadKind};

pub const NO_FILE_CHOSEN: &str = "no file chosen";

/// Local checks run before anything is sent upstream
pub fn validate_upload(
    kind: UploadKind,
    file: Option<UploadFile>,
    required_reference_name: &str,
) -> Result<UploadFile, String> {
    let Some(file) = file.filter(|f| !f.file_name.trim().is_empty()) else {
        return Err(NO_FILE_CHOSEN.to_string());
    };

    if kind == UploadKind::References && file.base_name() != required_reference_name {
        return Err(format!(
            "the percentages file must be named '{}' (got '{}')",
            required_reference_name, file.file_name
        ));
    }

    Ok(file)
}
