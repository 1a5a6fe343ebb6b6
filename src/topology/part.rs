use super::face::FaceId;

slotmap::new_key_type! {
    /// Unique identifier for a part in the topology graph.
    pub struct PartId;
}

/// A connected island of faces.
#[derive(Debug, Clone, Default)]
pub struct PartData {
    /// Member faces in ingest order.
    pub faces: Vec<FaceId>,
}
