use serde::{Deserialize, Serialize};

/// One ingested source file for a single extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub file_id: String,
    pub path: String,
    pub project: String,
    pub owner: String,
    pub session_id: String,
    pub loc: usize,
    pub file_size: usize,
    pub extension: String,
    pub timestamp: String, // RFC 3339 with microseconds and offset
}

impl SourceFile {
    pub fn new(
        owner: &str,
        project: &str,
        session_id: &str,
        path: &str,
        content: &str,
        timestamp: String,
    ) -> Self {
        let extension = std::path::Path::new(path)
            .extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .unwrap_or_default();

        SourceFile {
            file_id: uuid::Uuid::new_v4().to_string(),
            path: path.to_string(),
            project: project.to_string(),
            owner: owner.to_string(),
            session_id: session_id.to_string(),
            loc: content.lines().count(),
            file_size: content.len(),
            extension,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_size_loc_and_extension_from_content() {
        let file = SourceFile::new(
            "dev@example.com",
            "demo",
            "session-1",
            "src/app.py",
            "import os\n\nprint(os.getcwd())\n",
            "2026-10-18T10:00:00.000000+00:00".to_string(),
        );

        assert_eq!(file.loc, 3);
        assert_eq!(file.file_size, 30);
        assert_eq!(file.extension, "py");
        assert!(!file.file_id.is_empty());
    }

    #[test]
    fn files_without_a_dot_have_no_extension() {
        let file = SourceFile::new("a", "b", "c", "Makefile", "all:\n", String::new());
        assert_eq!(file.extension, "");
    }
}
