//! Not really a "database", a single JSON file is good enough
//! for remembering what was picked

use std::path::{Path, PathBuf};

use rootcause::{Report, option_ext::OptionExt, report};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;

use crate::APP_DIR;

pub trait Persistence {
    /// # Errors
    ///
    /// Nothing is stored under `json_key`, or it doesn't deserialize into `T`.
    fn get_data<T: DeserializeOwned>(&self, json_key: &str) -> Result<T, Report>;

    /// # Errors
    ///
    /// The backing store can't be written.
    fn save_data<T: Serialize>(&mut self, json_key: &str, obj: T) -> Result<(), Report>;
}

/// Stores every key of one JSON object in one file.
///
/// We store very little (a query to title map), and saving happens once a
/// search session is over, so rewriting the whole file each time is fine.
#[derive(Debug)]
pub struct FilesystemPersistence {
    data_file: PathBuf,
}

impl FilesystemPersistence {
    /// Opens `data.json` in the platform local data directory.
    ///
    /// # Errors
    ///
    /// The platform has no local data directory, or it can't be created.
    pub fn open() -> Result<Self, Report> {
        let mut data_file = dirs::data_local_dir().ok_or_report()?;
        data_file.push(APP_DIR);
        data_file.push("data.json");

        Self::open_at(&data_file)
    }

    /// # Errors
    ///
    /// The parent directory of `data_file` can't be created.
    pub fn open_at(data_file: &Path) -> Result<Self, Report> {
        if let Some(dir) = data_file.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|err| report!(err).attach(format!("creating {}", dir.display())))?;
        }

        Ok(Self {
            data_file: data_file.to_path_buf(),
        })
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.data_file
    }

    fn read_all(&self) -> Result<serde_json::Value, Report> {
        match std::fs::read(&self.data_file) {
            Ok(bytes) if bytes.is_empty() => Ok(json!({})),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(json!({})),
            Err(err) => Err(report!(err)
                .attach(format!("reading {}", self.data_file.display()))
                .into()),
        }
    }
}

impl Persistence for FilesystemPersistence {
    fn get_data<T: DeserializeOwned>(&self, json_key: &str) -> Result<T, Report> {
        let generic_json = self.read_all()?;
        let value = generic_json
            .get(json_key)
            .ok_or_else(|| report!("no data stored under {json_key}"))?;

        Ok(T::deserialize(value)?)
    }

    fn save_data<T: Serialize>(&mut self, json_key: &str, obj: T) -> Result<(), Report> {
        // A corrupt file is replaced rather than blocking every later save.
        let mut generic_json = self.read_all().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "discarding unreadable data file");
            json!({})
        });

        if let Some(map) = generic_json.as_object_mut() {
            map.insert(json_key.to_string(), serde_json::to_value(obj)?);
        }

        std::fs::write(&self.data_file, serde_json::to_vec(&generic_json)?).map_err(|err| {
            report!(err).attach(format!("writing {}", self.data_file.display()))
        })?;

        Ok(())
    }
}
