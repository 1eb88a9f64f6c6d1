use super::DirEntry;
use std::collections::BTreeMap;

/// In-memory directory structure of an archive's entry names.
#[derive(Debug, Default)]
pub struct NameTree {
    /// Directory path → (child name → is directory)
    dirs: BTreeMap<String, BTreeMap<String, bool>>,
    files: usize,
}

impl NameTree {
    pub fn insert_file(&mut self, path: &str) {
        if self.insert(path, false) {
            self.files += 1;
        }
    }

    pub fn insert_dir(&mut self, path: &str) {
        self.insert(path, true);
    }

    /// Returns true when the leaf was not present before.
    fn insert(&mut self, path: &str, leaf_is_dir: bool) -> bool {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((leaf, parents)) = segments.split_last() else {
            return false;
        };

        let mut dir = String::new();
        self.dirs.entry(String::new()).or_default();
        for segment in parents {
            self.dirs
                .entry(dir.clone())
                .or_default()
                .insert(segment.to_string(), true);
            if !dir.is_empty() {
                dir.push('/');
            }
            dir.push_str(segment);
            self.dirs.entry(dir.clone()).or_default();
        }

        if leaf_is_dir {
            let mut full = dir.clone();
            if !full.is_empty() {
                full.push('/');
            }
            full.push_str(leaf);
            self.dirs.entry(full).or_default();
        }

        self.dirs
            .entry(dir)
            .or_default()
            .insert(leaf.to_string(), leaf_is_dir)
            .is_none()
    }

    pub fn children(&self, dir: &str) -> Vec<DirEntry> {
        self.dirs
            .get(dir.trim_matches('/'))
            .map(|children| {
                children
                    .iter()
                    .map(|(name, is_dir)| DirEntry {
                        name: name.clone(),
                        is_dir: *is_dir,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_file(&self, path: &str) -> bool {
        let path = path.trim_matches('/');
        let (parent, name) = path.rsplit_once('/').unwrap_or(("", path));
        self.dirs
            .get(parent)
            .and_then(|children| children.get(name))
            .is_some_and(|is_dir| !is_dir)
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.dirs.contains_key(path.trim_matches('/'))
    }

    pub fn file_count(&self) -> usize {
        self.files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_structure() {
        let mut tree = NameTree::default();
        tree.insert_file("9ABC/java.base/java/util/List.sig");
        tree.insert_file("9ABC/java.base/java/util/Map.sig");
        tree.insert_dir("B-modules/");
        tree.insert_file("9ABC/java.base/java/util/List.sig");

        assert_eq!(tree.file_count(), 2);
        assert!(tree.is_file("9ABC/java.base/java/util/List.sig"));
        assert!(!tree.is_file("9ABC/java.base/java/util"));
        assert!(tree.is_dir("9ABC/java.base/java/util"));
        assert!(tree.is_dir("B-modules"));
        assert!(!tree.is_file("9ABC/java.base/java/util/Set.sig"));

        let roots: Vec<_> = tree.children("").into_iter().map(|e| e.name).collect();
        assert_eq!(roots, vec!["9ABC", "B-modules"]);
        assert!(tree.children("nowhere").is_empty());
    }
}
