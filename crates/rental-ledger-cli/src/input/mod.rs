pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Read a command's JSON document from `--input`, falling back to piped
/// stdin. `None` when neither was supplied.
pub fn document<T: DeserializeOwned>(
    path: Option<&str>,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if let Some(p) = path {
        return Ok(Some(file::read_json(p)?));
    }
    match stdin::read_stdin()? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Like [`document`] but the document is mandatory.
pub fn require<T: DeserializeOwned>(
    path: Option<&str>,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    document(path)?.ok_or_else(|| format!("--input <file.json> or stdin required for {what}").into())
}
