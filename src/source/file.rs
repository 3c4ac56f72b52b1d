//! Greeting configuration read from a YAML file.
//!
//! Mounting the ConfigMap as a volume puts each `data` key in its own file,
//! so pointing this source at `<mount>/app-config.yml` gives the same view as
//! querying the API, without needing RBAC.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{ConfigSource, SourceError};
use crate::greeting::GreetingConfig;

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

#[async_trait]
impl ConfigSource for FileSource {
    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }

    async fn fetch(&self) -> Result<Option<GreetingConfig>, SourceError> {
        let payload = match tokio::fs::read_to_string(&self.path).await {
            Ok(payload) => payload,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(GreetingConfig::from_yaml(&payload)?)
    }
}
