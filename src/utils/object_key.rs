/// An object key, decomposed into the parts the pipeline needs: the leaf
/// name without its extension, the extension itself, and the directory
/// prefix the renditions are uploaded back under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKeyDescriptor {
    /// Leaf file name without extension.
    pub base_name: String,
    /// Extension of the leaf, if it has one. Callers substitute the
    /// configured default when absent.
    pub extension: Option<String>,
    /// Everything before the last `/`, or `None` for keys at the bucket
    /// root. Renditions of root-level keys land at the destination root.
    pub directory_path: Option<String>,
}

/// Decompose an object key. The extension split happens on the *last* dot
/// of the leaf segment, so multi-dot names keep their full stem.
pub fn decompose(object_key: &str) -> ObjectKeyDescriptor {
    let (directory_path, leaf) = match object_key.rfind('/') {
        Some(idx) => (Some(object_key[..idx].to_string()), &object_key[idx + 1..]),
        None => (None, object_key),
    };

    match leaf.rfind('.') {
        Some(idx) => ObjectKeyDescriptor {
            base_name: leaf[..idx].to_string(),
            extension: Some(leaf[idx + 1..].to_string()),
            directory_path,
        },
        None => ObjectKeyDescriptor {
            base_name: leaf.to_string(),
            extension: None,
            directory_path,
        },
    }
}
