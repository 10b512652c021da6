//! Processor records and processing lineage.

use serde_json::{Map, Value, json};

/// One processor linked to an item.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ProcessorRecord {
    pub item_id: i64,
    /// Lineage name.
    pub name: String,
    pub facility: String,
    /// Processing level, higher is more derived.
    pub level: i32,
    pub version: String,
}

/// Aggregated `processing:*` properties of an item.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingLineage {
    pub lineage: String,
    pub facility: String,
    pub level: i32,
    /// Facility -> version.
    pub software: Map<String, Value>,
}

impl ProcessingLineage {
    /// Aggregate an item's records. The highest level is the lineage root;
    /// the first record seen wins ties.
    pub fn aggregate<'a, I>(records: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a ProcessorRecord>,
    {
        let mut root: Option<&ProcessorRecord> = None;
        let mut software = Map::new();

        for record in records {
            if root.is_none_or(|current| record.level > current.level) {
                root = Some(record);
            }
            software.insert(record.facility.clone(), json!(record.version));
        }

        root.map(|root| Self {
            lineage: root.name.clone(),
            facility: root.facility.clone(),
            level: root.level,
            software,
        })
    }

    /// Write the `processing:*` properties.
    pub fn write_to(&self, properties: &mut Map<String, Value>) {
        properties.insert("processing:lineage".into(), json!(self.lineage));
        properties.insert("processing:facility".into(), json!(self.facility));
        properties.insert("processing:level".into(), json!(self.level));
        properties.insert(
            "processing:software".into(),
            Value::Object(self.software.clone()),
        );
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn record(name: &str, facility: &str, level: i32, version: &str) -> ProcessorRecord {
        ProcessorRecord {
            item_id: 1,
            name: name.into(),
            facility: facility.into(),
            level,
            version: version.into(),
        }
    }

    #[test]
    fn highest_level_is_root() {
        let records = [
            record("sen2cor", "ESA", 2, "2.8"),
            record("force", "FORCE", 3, "3.6"),
            record("l1c", "ESA-L1", 1, "1.0"),
        ];
        let lineage = ProcessingLineage::aggregate(&records).unwrap();
        assert_eq!(lineage.lineage, "force");
        assert_eq!(lineage.level, 3);
        assert_eq!(lineage.software.len(), 3);
        assert_eq!(lineage.software["ESA"], json!("2.8"));
    }

    #[test]
    fn first_seen_wins_ties() {
        let records = [record("a", "F1", 2, "1"), record("b", "F2", 2, "1")];
        let lineage = ProcessingLineage::aggregate(&records).unwrap();
        assert_eq!(lineage.lineage, "a");
        assert_eq!(lineage.facility, "F1");
    }

    #[test]
    fn no_records_no_lineage() {
        assert!(ProcessingLineage::aggregate(&Vec::<ProcessorRecord>::new()).is_none());
    }

    #[test]
    fn writes_processing_properties() {
        let lineage = ProcessingLineage::aggregate(&[record("a", "F1", 2, "1.2")]).unwrap();
        let mut props = Map::new();
        lineage.write_to(&mut props);
        assert_eq!(props["processing:lineage"], json!("a"));
        assert_eq!(props["processing:software"], json!({"F1": "1.2"}));
    }
}
