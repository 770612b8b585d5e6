use crate::error::PipelineResult;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const SKIPPED_STATE_DIR: &str = ".maintainability";

/// `.gitignore` rules rooted at the scanned directory.
///
/// Patterns follow git semantics: a leading or inner `/` anchors to the root,
/// `*` stops at `/`, a trailing `/` matches directories only and `!` re-includes.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    matcher: Gitignore,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        IgnoreRules { matcher: Gitignore::empty() }
    }
}

impl IgnoreRules {
    pub fn new<S: AsRef<str>>(root: &Path, lines: &[S]) -> Self {
        let mut builder = GitignoreBuilder::new(root);
        add_lines(&mut builder, lines);
        Self::build(builder)
    }

    /// Rules from `<root>/.gitignore` followed by `extra`, so `extra` wins on conflicts.
    pub fn for_root(root: &Path, extra: &[String]) -> Self {
        let mut builder = GitignoreBuilder::new(root);
        let gitignore = root.join(".gitignore");
        if gitignore.is_file() {
            if let Some(e) = builder.add(&gitignore) {
                log::warn!("Partially read {}: {e}", gitignore.display());
            }
        } else {
            log::warn!(".gitignore not found under {}; only configured patterns apply", root.display());
        }
        add_lines(&mut builder, extra);
        Self::build(builder)
    }

    fn build(builder: GitignoreBuilder) -> Self {
        match builder.build() {
            Ok(matcher) => IgnoreRules { matcher },
            Err(e) => {
                log::warn!("Ignore rules could not be compiled ({e}); nothing is ignored");
                Self::default()
            }
        }
    }

    /// Whether `relative_path`, or any directory above it, is ignored.
    pub fn is_ignored(&self, relative_path: &str, is_dir: bool) -> bool {
        self.matcher
            .matched_path_or_any_parents(relative_path, is_dir)
            .is_ignore()
    }
}

fn add_lines<S: AsRef<str>>(builder: &mut GitignoreBuilder, lines: &[S]) {
    for line in lines {
        if let Err(e) = builder.add_line(None, line.as_ref()) {
            log::warn!("Ignoring invalid pattern {:?}: {e}", line.as_ref());
        }
    }
}

/// Recursively collect `relative path -> content` for source files under `root`.
///
/// Only files whose extension is in `extensions` (e.g. `".py"`) are read.
/// Undecodable bytes are replaced rather than failing the walk.
pub fn collect_sources(root: &Path, extensions: &[String], rules: &IgnoreRules) -> PipelineResult<BTreeMap<String, String>> {
    let walk_root = root.to_path_buf();
    let walk_rules = rules.clone();

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            if name == ".git" || name == SKIPPED_STATE_DIR {
                return false;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            !walk_rules.is_ignored(&to_relative_path(&walk_root, entry.path()), is_dir)
        })
        .build();

    let mut sources = BTreeMap::new();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        if has_allowed_extension(entry.path(), extensions) {
            let bytes = fs::read(entry.path())?;
            sources.insert(
                to_relative_path(root, entry.path()),
                String::from_utf8_lossy(&bytes).into_owned(),
            );
        }
    }

    log::info!("Collected {} source files under {}", sources.len(), root.display());
    Ok(sources)
}

fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.') == ext),
        None => false,
    }
}

fn to_relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, relative: &str, content: &[u8]) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, content).expect("write");
    }

    fn collect_paths(root: &Path, rules: &IgnoreRules) -> Vec<String> {
        collect_sources(root, &[".py".to_string()], rules)
            .expect("collect")
            .into_keys()
            .collect()
    }

    #[test]
    fn collects_allowed_extensions_recursively() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(tmp.path(), "app.py", b"print('hi')\n");
        write(tmp.path(), "pkg/util.py", b"def f():\n    pass\n");
        write(tmp.path(), "README.md", b"# readme\n");

        assert_eq!(collect_paths(tmp.path(), &IgnoreRules::default()), vec!["app.py", "pkg/util.py"]);
    }

    #[test]
    fn honors_gitignore_and_extra_patterns() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(tmp.path(), ".gitignore", b"# build output\nbuild/\n*.gen.py\n");
        write(tmp.path(), "build/out.py", b"x = 1\n");
        write(tmp.path(), "schema.gen.py", b"x = 1\n");
        write(tmp.path(), "src/api.gen.py", b"x = 1\n");
        write(tmp.path(), "vendor/lib.py", b"x = 1\n");
        write(tmp.path(), "src/main.py", b"x = 1\n");

        let rules = IgnoreRules::for_root(tmp.path(), &["vendor".to_string()]);
        assert_eq!(collect_paths(tmp.path(), &rules), vec!["src/main.py"]);
    }

    #[test]
    fn anchored_pattern_only_matches_at_the_root() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(tmp.path(), ".gitignore", b"/config.py\n");
        write(tmp.path(), "config.py", b"x = 1\n");
        write(tmp.path(), "pkg/config.py", b"x = 1\n");

        let rules = IgnoreRules::for_root(tmp.path(), &[]);
        assert!(rules.is_ignored("config.py", false));
        assert!(!rules.is_ignored("pkg/config.py", false));
        assert_eq!(collect_paths(tmp.path(), &rules), vec!["pkg/config.py"]);
    }

    #[test]
    fn star_does_not_cross_directories() {
        let rules = IgnoreRules::new(Path::new("/repo"), &["src/*.py"]);
        assert!(rules.is_ignored("src/main.py", false));
        assert!(!rules.is_ignored("src/nested/main.py", false));
    }

    #[test]
    fn negation_reincludes_a_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(tmp.path(), "gen/a.py", b"x = 1\n");
        write(tmp.path(), "keep.py", b"x = 1\n");
        write(tmp.path(), "drop.py", b"x = 1\n");

        let rules = IgnoreRules::new(tmp.path(), &["# note", "", "*.py", "!keep.py"]);
        assert!(!rules.is_ignored("keep.py", false));
        assert!(rules.is_ignored("gen/a.py", false));
        assert_eq!(collect_paths(tmp.path(), &rules), vec!["keep.py"]);
    }

    #[test]
    fn directory_pattern_covers_nested_files() {
        let rules = IgnoreRules::new(Path::new("/repo"), &["generated/"]);
        assert!(rules.is_ignored("generated", true));
        assert!(rules.is_ignored("generated/deep/schema.py", false));
        assert!(!rules.is_ignored("src/generated.py", false));
    }

    #[test]
    fn skips_git_and_state_directories() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(tmp.path(), ".git/hooks/pre.py", b"x = 1\n");
        write(tmp.path(), ".maintainability/cache.py", b"x = 1\n");
        write(tmp.path(), ".tools/lint.py", b"x = 1\n");

        assert_eq!(collect_paths(tmp.path(), &IgnoreRules::default()), vec![".tools/lint.py"]);
    }

    #[test]
    fn replaces_invalid_utf8() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(tmp.path(), "odd.py", &[b'x', b'=', 0xff, b'\n']);

        let sources = collect_sources(tmp.path(), &["py".to_string()], &IgnoreRules::default()).expect("collect");
        assert_eq!(sources["odd.py"], "x=\u{fffd}\n");
    }
}
