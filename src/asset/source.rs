//! Input expansion: plain paths and `*` / `**` globs under the source root.

use std::io;
use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};
use regex::Regex;

/// Check whether an input identifier contains glob wildcards.
#[inline]
pub fn is_glob(input: &str) -> bool {
    input.contains('*')
}

/// Expand a glob relative to `root` into matching files, sorted.
///
/// `*` matches within one path segment, `**` across segments. A pattern
/// matching nothing is a `NotFound` error.
pub fn expand_glob(root: &Path, pattern: &str) -> io::Result<Vec<PathBuf>> {
    let pattern = pattern.trim_start_matches("./");
    let (base, rest) = split_base(pattern);
    let matcher = compile(rest)?;
    let base_dir = root.join(base);

    if !base_dir.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("glob base `{}` is not a directory", base_dir.display()),
        ));
    }

    // Serial: globs expand inside the dumper's rayon jobs
    let mut matches = Vec::new();
    for entry in WalkDir::new(&base_dir).parallelism(Parallelism::Serial) {
        let entry = entry.map_err(io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let matched = path
            .strip_prefix(&base_dir)
            .ok()
            .and_then(|rel| rel.to_str())
            .is_some_and(|rel| matcher.is_match(&rel.replace('\\', "/")));
        if matched {
            matches.push(path);
        }
    }
    matches.sort();

    if matches.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no files match `{pattern}`"),
        ));
    }
    Ok(matches)
}

/// Split `css/vendor/*.css` into (`css/vendor`, `*.css`).
fn split_base(pattern: &str) -> (&str, &str) {
    let wildcard = pattern.find('*').unwrap_or(pattern.len());
    match pattern[..wildcard].rfind('/') {
        Some(slash) => (&pattern[..slash], &pattern[slash + 1..]),
        None => ("", pattern),
    }
}

fn compile(glob: &str) -> io::Result<Regex> {
    let mut re = String::with_capacity(glob.len() * 2 + 2);
    re.push('^');
    let mut rest = glob;
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix("**/") {
            re.push_str("(?:.*/)?");
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix("**") {
            re.push_str(".*");
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix('*') {
            re.push_str("[^/]*");
            rest = tail;
        } else {
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                re.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
            }
            rest = chars.as_str();
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, rel).unwrap();
    }

    fn names(root: &Path, paths: Vec<PathBuf>) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_split_base() {
        assert_eq!(split_base("css/*.css"), ("css", "*.css"));
        assert_eq!(split_base("*.js"), ("", "*.js"));
        assert_eq!(split_base("a/b/**/x.js"), ("a/b", "**/x.js"));
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "css/b.css");
        touch(dir.path(), "css/a.css");
        touch(dir.path(), "css/vendor/c.css");
        touch(dir.path(), "css/readme.md");

        let found = expand_glob(dir.path(), "css/*.css").unwrap();
        assert_eq!(names(dir.path(), found), ["css/a.css", "css/b.css"]);
    }

    #[test]
    fn test_double_star_recurses() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "js/app.js");
        touch(dir.path(), "js/lib/util.js");
        touch(dir.path(), "js/lib/deep/more.js");

        let found = expand_glob(dir.path(), "js/**/*.js").unwrap();
        assert_eq!(
            names(dir.path(), found),
            ["js/app.js", "js/lib/deep/more.js", "js/lib/util.js"]
        );
    }

    #[test]
    fn test_no_match_is_error() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "css/a.css");
        let err = expand_glob(dir.path(), "css/*.scss").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(expand_glob(dir.path(), "missing/*.css").is_err());
    }

    #[test]
    fn test_expand_inside_busy_rayon_pool() {
        use rayon::prelude::*;

        let dir = TempDir::new().unwrap();
        touch(dir.path(), "css/a.css");
        touch(dir.path(), "css/b.css");

        let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let results: Vec<usize> = pool.install(|| {
            (0..16)
                .into_par_iter()
                .map(|_| expand_glob(dir.path(), "css/*.css").unwrap().len())
                .collect()
        });
        assert!(results.iter().all(|&n| n == 2));
    }
}
