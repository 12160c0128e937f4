use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetInfo {
    pub name: String,
    pub tags: Vec<String>,
    pub anti_tags: Vec<String>,
}

/// The slice of an asset's `info.json` the spawn planner cares about.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct InfoJson {
    #[serde(default)]
    pub tags: Vec<serde_json::Value>,
    #[serde(default)]
    pub anti_tags: Vec<serde_json::Value>,
}

impl AssetInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: Vec::new(),
            anti_tags: Vec::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = clean_labels(tags);
        self
    }

    pub fn with_anti_tags<I, S>(mut self, anti_tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.anti_tags = clean_labels(anti_tags);
        self
    }

    pub(crate) fn from_info_json(name: &str, raw: InfoJson) -> Self {
        Self::new(name)
            .with_tags(string_entries(raw.tags))
            .with_anti_tags(string_entries(raw.anti_tags))
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|candidate| candidate == tag)
    }

    pub fn has_anti_tag(&self, tag: &str) -> bool {
        self.anti_tags.iter().any(|candidate| candidate == tag)
    }
}

// Non-string entries in the tag arrays are ignored rather than rejected.
fn string_entries(values: Vec<serde_json::Value>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|value| match value {
            serde_json::Value::String(text) => Some(text),
            _ => None,
        })
        .collect()
}

fn clean_labels<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    labels
        .into_iter()
        .map(Into::into)
        .filter(|label| !label.is_empty())
        .collect()
}
