use serde::Deserialize;

/// Inbound storage notification: an ordered list of records, each pointing
/// at exactly one (bucket, key) pair. Shaped like the S3 event JSON; fields
/// this worker does not consume are ignored on deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct S3EventNotification {
    /// Absent on housekeeping payloads such as s3:TestEvent, which carry no
    /// records at all.
    #[serde(rename = "Records", default)]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3EventRecord {
    #[serde(rename = "eventName", default)]
    pub event_name: Option<String>,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: S3BucketEntity,
    pub object: S3ObjectEntity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3BucketEntity {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3ObjectEntity {
    pub key: String,
    #[serde(default)]
    pub size: Option<i64>,
}
