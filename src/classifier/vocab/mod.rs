
use anyhow::{Context, Result, anyhow};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

pub const INTENT_MAP_FILE: &str = "intent_map.json";

/// The versioned intent vocabulary: a bidirectional mapping between intent
/// labels and contiguous class indices starting at 0. The index order is
/// the order classifier probability vectors are aligned to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentVocabulary {
    labels: Vec<String>,
    index_by_label: HashMap<String, usize>,
}

impl IntentVocabulary {
    /// Build a vocabulary from labels already in index order.
    #[inline]
    pub fn from_labels(labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(anyhow!("Intent vocabulary cannot be empty"));
        }

        let mut index_by_label = HashMap::with_capacity(labels.len());
        for (index, label) in labels.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(anyhow!("Intent label at index {} is empty", index));
            }
            if index_by_label.insert(label.clone(), index).is_some() {
                return Err(anyhow!("Duplicate intent label: {}", label));
            }
        }

        Ok(Self {
            labels,
            index_by_label,
        })
    }

    /// Build a vocabulary from a label → index map, validating that the
    /// indices are unique and contiguous from 0.
    #[inline]
    pub fn from_map(map: HashMap<String, usize>) -> Result<Self> {
        if map.is_empty() {
            return Err(anyhow!("Intent vocabulary cannot be empty"));
        }

        let mut slots: Vec<Option<String>> = vec![None; map.len()];
        let slots_len = slots.len();
        for (label, index) in map {
            let slot = slots.get_mut(index).ok_or_else(|| {
                anyhow!(
                    "Intent index {} for label '{}' is out of range (vocabulary size {})",
                    index,
                    label,
                    slots_len
                )
            })?;
            if let Some(existing) = slot {
                return Err(anyhow!(
                    "Intent index {} is assigned to both '{}' and '{}'",
                    index,
                    existing,
                    label
                ));
            }
            *slot = Some(label);
        }

        let labels = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.ok_or_else(|| anyhow!("Intent index {} is unassigned", index)))
            .collect::<Result<Vec<String>>>()?;

        Self::from_labels(labels)
    }

    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read intent map: {}", path.display()))?;

        let map: HashMap<String, usize> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse intent map: {}", path.display()))?;

        Self::from_map(map)
            .with_context(|| format!("Invalid intent map: {}", path.display()))
    }

    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        let map: BTreeMap<&str, usize> = self
            .labels
            .iter()
            .enumerate()
            .map(|(index, label)| (label.as_str(), index))
            .collect();

        let content =
            serde_json::to_string_pretty(&map).context("Failed to serialize intent map")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write intent map: {}", path.display()))?;

        Ok(())
    }

    /// Labels in index order.
    #[inline]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[inline]
    pub fn label_for(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    #[inline]
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index_by_label.get(label).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
