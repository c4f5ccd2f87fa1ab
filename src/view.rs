//! Saved views: named search/filter/sort/page-size presets stored as JSON
//! files under `<config dir>/views/`.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::column::ColumnSet;
use crate::config::ConfigManager;
use crate::filter::{FilterError, FilterSet, FilterSpec};
use crate::pipeline::PipelineRequest;
use crate::sort::SortSpec;

// SystemTime as seconds since the epoch
mod time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).map_err(|e| {
            serde::ser::Error::custom(format!("Failed to serialize SystemTime: {}", e))
        })?;
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + std::time::Duration::from_secs(secs))
    }

    pub mod option {
        use super::*;

        pub fn serialize<S>(time: &Option<SystemTime>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match time {
                Some(time) => super::serialize(time, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SystemTime>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<u64>::deserialize(deserializer)?
                .map(|secs| Ok(UNIX_EPOCH + std::time::Duration::from_secs(secs)))
                .transpose()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "time_serde")]
    pub created: SystemTime,
    #[serde(with = "time_serde::option")]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub last_used: Option<SystemTime>,
    #[serde(default)]
    pub usage_count: usize,
    pub settings: ViewSettings,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewSettings {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub query: String,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub sort: Option<SortSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub page_size: Option<NonZeroUsize>,
}

impl ViewSettings {
    /// Capture the reusable parts of a request. The page is not saved.
    pub fn from_request(request: &PipelineRequest) -> Self {
        Self {
            query: request.query.clone(),
            filters: request.filters.specs().cloned().collect(),
            sort: request.sort.clone(),
            page_size: Some(request.page_size),
        }
    }

    /// Build a first-page request for `columns`. Filters are revalidated since
    /// the columns may differ from when the view was saved.
    pub fn to_request(
        &self,
        columns: &ColumnSet,
        default_page_size: NonZeroUsize,
    ) -> std::result::Result<PipelineRequest, FilterError> {
        let filters = FilterSet::new(self.filters.clone(), columns)?;
        Ok(PipelineRequest::default()
            .with_query(self.query.clone())
            .with_filters(filters)
            .with_sort(self.sort.clone())
            .with_page_size(self.page_size.unwrap_or(default_page_size)))
    }
}

pub struct ViewManager {
    config: ConfigManager,
    views: Vec<View>,
    pub(crate) views_dir: PathBuf,
}

impl ViewManager {
    pub fn new(config: &ConfigManager) -> Result<Self> {
        // The views directory is created lazily on first save
        let views_dir = config.config_dir().join("views");

        let mut manager = Self {
            config: config.clone(),
            views: Vec::new(),
            views_dir,
        };

        manager.load_views()?;
        Ok(manager)
    }

    pub fn load_views(&mut self) -> Result<()> {
        self.views.clear();

        if !self.views_dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(&self.views_dir)? {
            let path = entry?.path();

            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("json") {
                match fs::read_to_string(&path) {
                    Ok(content) => match serde_json::from_str::<View>(&content) {
                        Ok(view) => self.views.push(view),
                        Err(e) => {
                            tracing::warn!(path = %path.display(), error = %e, "could not parse view file");
                        }
                    },
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "could not read view file");
                    }
                }
            }
        }

        self.views.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(())
    }

    fn view_path(&self, id: &str) -> PathBuf {
        self.views_dir.join(format!("view_{}.json", id))
    }

    pub fn save_view(&self, view: &View) -> Result<()> {
        self.config.ensure_config_dir()?;
        fs::create_dir_all(&self.views_dir)?;

        let json = serde_json::to_string_pretty(view)?;

        use fs2::FileExt;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.view_path(&view.id))?;

        file.lock_exclusive()?;
        file.write_all(json.as_bytes())?;
        file.flush()?;
        file.unlock()?;

        Ok(())
    }

    /// Create and save a view. Saving under an existing name replaces that view.
    pub fn create_view(
        &mut self,
        name: String,
        description: Option<String>,
        settings: ViewSettings,
    ) -> Result<View> {
        if name.trim().is_empty() {
            return Err(eyre!("View name cannot be empty"));
        }
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
            .hash(&mut hasher);
        let id = format!("{:016x}", hasher.finish());

        let view = View {
            id,
            name,
            description,
            created: SystemTime::now(),
            last_used: None,
            usage_count: 0,
            settings,
        };

        self.store_replacing(view)
    }

    /// Save `view`, then drop any other view with the same name. The old file
    /// is removed only once the new one is on disk.
    fn store_replacing(&mut self, view: View) -> Result<View> {
        let replaced = self.get_view_by_name(&view.name).map(|v| v.id.clone());
        self.save_view(&view)?;
        if let Some(old_id) = replaced.filter(|old_id| *old_id != view.id) {
            self.delete_view(&old_id)?;
        }
        self.load_views()?;

        Ok(view)
    }

    /// Bump the usage statistics of the named view and persist them.
    pub fn record_use(&mut self, name: &str) -> Result<()> {
        let view = self
            .views
            .iter_mut()
            .find(|v| v.name == name)
            .ok_or_else(|| eyre!("No view named '{}'", name))?;
        view.usage_count += 1;
        view.last_used = Some(SystemTime::now());
        let view = view.clone();
        self.save_view(&view)
    }

    pub fn delete_view(&mut self, id: &str) -> Result<()> {
        let file_path = self.view_path(id);
        if file_path.exists() {
            fs::remove_file(&file_path)?;
        }

        self.views.retain(|v| v.id != id);
        Ok(())
    }

    pub fn view_exists(&self, name: &str) -> bool {
        self.views.iter().any(|v| v.name == name)
    }

    pub fn get_view_by_name(&self, name: &str) -> Option<&View> {
        self.views.iter().find(|v| v.name == name)
    }

    /// All views, sorted by name.
    pub fn all_views(&self) -> &[View] {
        &self.views
    }

    pub fn remove_all_views(&mut self) -> Result<usize> {
        let mut removed = 0;
        if self.views_dir.exists() {
            for entry in fs::read_dir(&self.views_dir)? {
                let path = entry?.path();
                if path.is_file()
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|s| s.starts_with("view_") && s.ends_with(".json"))
                {
                    fs::remove_file(&path)?;
                    removed += 1;
                }
            }
        }

        self.views.clear();
        Ok(removed)
    }
}
