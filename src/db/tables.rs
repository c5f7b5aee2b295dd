use redb::TableDefinition;

/// Gallery documents: item id -> GalleryItem (bincode, serde mode)
pub const GALLERY: TableDefinition<&str, &[u8]> = TableDefinition::new("gallery");
